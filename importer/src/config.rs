//! Runtime configuration.
//!
//! Built once in `main` from the environment (a `.env` file is honored) and
//! passed by reference to the transport client and run controller.

use std::env;
use std::fmt;

/// Ingestion API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:3001";

/// Front-end base URL serving the datalake upload route.
pub const DEFAULT_FRONT_URL: &str = "http://localhost:3000";

/// Team used when neither the environment nor `--team` provides one.
pub const DEFAULT_TEAM_ID: &str = "default_team";

pub const ENV_API_URL: &str = "BIZIMPORT_API_URL";
pub const ENV_API_KEY: &str = "BIZIMPORT_API_KEY";
pub const ENV_FRONT_URL: &str = "BIZIMPORT_FRONT_URL";
pub const ENV_TEAM_ID: &str = "BIZIMPORT_TEAM_ID";

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    /// Bearer token; `None` means no `Authorization` header is sent.
    pub api_key: Option<String>,
    pub front_url: String,
    pub team_id: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("front_url", &self.front_url)
            .field("team_id", &self.team_id)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load from process environment, reading `.env` first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            api_url: trim_base(get(ENV_API_URL).as_deref().unwrap_or(DEFAULT_API_URL)),
            api_key: get(ENV_API_KEY),
            front_url: trim_base(get(ENV_FRONT_URL).as_deref().unwrap_or(DEFAULT_FRONT_URL)),
            team_id: get(ENV_TEAM_ID).unwrap_or_else(|| DEFAULT_TEAM_ID.to_string()),
        }
    }

    pub fn with_api_url(mut self, url: Option<&str>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api_url = trim_base(url);
        }
        self
    }

    pub fn with_front_url(mut self, url: Option<&str>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.front_url = trim_base(url);
        }
        self
    }

    pub fn with_team(mut self, team: Option<&str>) -> Self {
        if let Some(team) = team.map(str::trim).filter(|t| !t.is_empty()) {
            self.team_id = team.to_string();
        }
        self
    }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
