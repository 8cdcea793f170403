//! Error types for the import pipelines.
//!
//! - [`ReadError`] - CSV source reading errors
//! - [`TransportError`] - Remote endpoint errors
//! - [`ConfigError`] - Invalid operator input
//! - [`ImportError`] - Top-level run errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// =============================================================================
// Read Errors
// =============================================================================

/// Errors while reading a CSV source.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Failed to read a file.
    #[error("Cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Header file is absent.
    #[error("Header file not found: {}", .0.display())]
    MissingHeaderFile(PathBuf),

    /// Source contains no rows at all.
    #[error("CSV file is empty")]
    EmptyFile,

    /// First row produced zero usable column names.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// The CSV reader rejected the header row.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),
}

impl ReadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors from a single network transfer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request exceeded the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Endpoint answered with something other than 200.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection or protocol failure.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// 200 response whose body could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Local file for an upload could not be read.
    #[error("Cannot read upload file: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in operator-supplied configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown sector '{0}' (run `bizimport sectors` for the list)")]
    UnknownSector(String),

    #[error("Invalid window --start {start} --end {end} for {total} units")]
    InvalidWindow {
        start: usize,
        end: usize,
        total: usize,
    },

    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("Unsupported encoding '{0}' (expected utf-8, windows-1252, iso-8859-1 or auto)")]
    InvalidEncoding(String),

    #[error("Path not found: {}", .0.display())]
    MissingPath(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot build HTTP client: {0}")]
    HttpClient(String),
}

// =============================================================================
// Import Errors (top-level)
// =============================================================================

/// Fatal errors that stop a run before any unit is attempted.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("No block files found in {}", .0.display())]
    NoUnits(PathBuf),

    #[error("No valid records parsed from {}", .0.display())]
    NoRecords(PathBuf),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type ReadResult<T> = Result<T, ReadError>;

pub type TransportResult<T> = Result<T, TransportError>;

pub type ImportResult<T> = Result<T, ImportError>;
