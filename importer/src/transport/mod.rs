//! HTTP transport for import units.
//!
//! One call per unit, bounded by the client timeout, never retried here:
//! retries are an operator decision driven by the run summary.
//!
//! | Method | Path                   | Body                                   |
//! |--------|------------------------|----------------------------------------|
//! | POST   | `/api/sectors/import`  | JSON `{sectorId, records, source, chunk, totalChunks}` |
//! | POST   | `/api/luci/datalake`   | multipart `file`, `sector`, `isHeader` |

pub mod types;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use std::fmt;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ConfigError, TransportError, TransportResult};

pub use types::{ImportAck, ImportRequest, UploadAck, UploadRequest};
use types::{DatalakeResponse, ImportResponse};

pub const IMPORT_PATH: &str = "/api/sectors/import";
pub const DATALAKE_PATH: &str = "/api/luci/datalake";

/// Timeout for block pipelines.
pub const BLOCK_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for single-file batches, which are larger.
pub const FILE_TIMEOUT: Duration = Duration::from_secs(180);

/// Error bodies are cut to this many characters.
pub const MAX_ERROR_BODY_CHARS: usize = 200;

const CLIENT_USER_AGENT: &str = concat!("bizimport/", env!("CARGO_PKG_VERSION"));

/// Destination for units. The run controller only talks to this trait.
#[allow(async_fn_in_trait)]
pub trait UnitSink {
    /// Send a batch of records to the ingestion endpoint.
    async fn import(&self, request: &ImportRequest<'_>) -> TransportResult<ImportAck>;

    /// Upload a raw CSV file to the datalake.
    async fn upload(&self, request: &UploadRequest<'_>) -> TransportResult<UploadAck>;
}

/// Production [`UnitSink`] backed by reqwest.
#[derive(Clone)]
pub struct ImportClient {
    http: reqwest::Client,
    import_url: String,
    datalake_url: String,
    team_id: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl fmt::Debug for ImportClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportClient")
            .field("import_url", &self.import_url)
            .field("datalake_url", &self.datalake_url)
            .field("team_id", &self.team_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ImportClient {
    pub fn new(config: &Config, timeout: Duration) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(CLIENT_USER_AGENT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            import_url: format!("{}{}", config.api_url, IMPORT_PATH),
            datalake_url: format!("{}{}", config.front_url, DATALAKE_PATH),
            team_id: config.team_id.clone(),
            api_key: config.api_key.clone(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST one batch as JSON. A 200 without an `imported` count is taken to
    /// mean every record was accepted.
    pub async fn import_batch(&self, request: &ImportRequest<'_>) -> TransportResult<ImportAck> {
        let builder = self
            .http
            .post(&self.import_url)
            .header(CONTENT_TYPE, "application/json")
            .header("x-team-id", &self.team_id)
            .json(request);

        let body = self.send(builder).await?;

        let imported = serde_json::from_str::<ImportResponse>(&body)
            .ok()
            .and_then(|r| r.imported)
            .unwrap_or(request.records.len() as u64);

        Ok(ImportAck { imported })
    }

    /// POST one raw CSV file as multipart form data.
    pub async fn upload_file(&self, request: &UploadRequest<'_>) -> TransportResult<UploadAck> {
        let bytes = tokio::fs::read(request.path).await?;
        let file_name = request
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let form = Form::new()
            .part("file", part)
            .text("sector", request.sector.id())
            .text("isHeader", if request.is_header { "true" } else { "false" });

        let body = self
            .send(self.http.post(&self.datalake_url).multipart(form))
            .await?;

        let parsed: DatalakeResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        Ok(parsed.uploaded.unwrap_or_default())
    }

    /// Attach auth, send, and return the body of a 200 response.
    async fn send(&self, mut builder: RequestBuilder) -> TransportResult<String> {
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if status != StatusCode::OK {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(body)
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

impl UnitSink for ImportClient {
    async fn import(&self, request: &ImportRequest<'_>) -> TransportResult<ImportAck> {
        self.import_batch(request).await
    }

    async fn upload(&self, request: &UploadRequest<'_>) -> TransportResult<UploadAck> {
        self.upload_file(request).await
    }
}

/// Keep the first [`MAX_ERROR_BODY_CHARS`] characters of an error body.
pub fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
