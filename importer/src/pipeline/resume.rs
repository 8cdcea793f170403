//! Re-invocation commands for resuming a run at a failed unit.
//!
//! A resume command must reproduce the original run exactly, so every flag
//! that changes what is read or where it goes is carried over; flags left
//! at their default are omitted. `--start` / `--end` are added per failed
//! ordinal by the report.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use super::{DEFAULT_DELAY, DEFAULT_SOURCE};
use crate::batch::DEFAULT_BATCH_SIZE;
use crate::models::Sector;
use crate::parser::{ReadOptions, TextEncoding};

pub const PROGRAM: &str = "bizimport";

/// Quote `raw` for a POSIX shell. Plain words are left alone.
pub fn shell_quote(raw: &str) -> String {
    let plain = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@%+".contains(c));

    if plain {
        raw.to_string()
    } else {
        format!("'{}'", raw.replace('\'', r"'\''"))
    }
}

/// Seconds as accepted by `--delay` / `--timeout`.
pub fn format_seconds(duration: Duration) -> String {
    format!("{}", duration.as_secs_f64())
}

/// Shell words of one `bizimport` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeCommand {
    words: Vec<String>,
}

impl ResumeCommand {
    pub fn new(subcommand: &str, path: &Path, sector: Sector) -> Self {
        Self {
            words: vec![
                PROGRAM.to_string(),
                subcommand.to_string(),
                shell_quote(&path.to_string_lossy()),
                "--sector".to_string(),
                sector.id().to_string(),
            ],
        }
    }

    /// Append `flag value`, quoting the value.
    pub fn arg(mut self, flag: &str, value: impl fmt::Display) -> Self {
        self.words.push(flag.to_string());
        self.words.push(shell_quote(&value.to_string()));
        self
    }

    pub fn arg_if(self, condition: bool, flag: &str, value: impl fmt::Display) -> Self {
        if condition {
            self.arg(flag, value)
        } else {
            self
        }
    }

    pub fn switch(mut self, flag: &str) -> Self {
        self.words.push(flag.to_string());
        self
    }

    /// Append already-quoted words.
    pub fn extend<S: AsRef<str>>(mut self, words: &[S]) -> Self {
        self.words.extend(words.iter().map(|w| w.as_ref().to_string()));
        self
    }

    /// Reading flags that differ from the pipeline's defaults.
    pub fn read_flags(self, read: &ReadOptions, defaults: &ReadOptions) -> Self {
        let name_parts = if read.keep_name_parts { "keep" } else { "drop" };
        self.arg_if(read.encoding != TextEncoding::Utf8, "--encoding", read.encoding)
            .arg_if(
                read.keep_name_parts != defaults.keep_name_parts,
                "--name-parts",
                name_parts,
            )
    }

    pub fn source(self, source: &str) -> Self {
        self.arg_if(source != DEFAULT_SOURCE, "--source", source)
    }

    pub fn delay(self, delay: Duration) -> Self {
        self.arg_if(delay != DEFAULT_DELAY, "--delay", format_seconds(delay))
    }

    pub fn chunk_size(self, chunk_size: usize) -> Self {
        self.arg_if(chunk_size != DEFAULT_BATCH_SIZE, "--chunk-size", chunk_size)
    }

    pub fn render(&self) -> String {
        self.words.join(" ")
    }
}

impl fmt::Display for ResumeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
