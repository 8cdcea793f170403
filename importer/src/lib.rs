//! # bizimport - vendor business-listing CSV importer
//!
//! Normalizes heterogeneous business-directory CSV exports into one
//! canonical record shape and pushes them, in resumable units, either to a
//! JSON ingestion API or to a datalake upload endpoint.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV source │────▶│   Reader    │────▶│  Partition  │────▶│  Transport  │
//! │ file/blocks │     │ (normalize) │     │  + window   │     │ (sequential)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bizimport::{run_file_import, Config, ImportClient, ReadOptions, RunOptions, Sector};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ImportClient::new(&Config::from_env(), Duration::from_secs(180))?;
//!     let options = RunOptions::new(Sector::Realtors);
//!     let result = run_file_import(&client, "export.csv".as_ref(), &ReadOptions::single_file(), 10_000, &options).await?;
//!     println!("{} units failed", result.units_failed());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Canonical fields, records and sectors
//! - [`normalize`] - Header normalization and synonym tables
//! - [`parser`] - CSV reading with encoding/delimiter detection
//! - [`batch`] - Batches, ordinal windows and block discovery
//! - [`transport`] - Ingestion and datalake HTTP client
//! - [`pipeline`] - Run controller and summary
//! - [`validation`] - Field coverage report
//! - [`config`] - Environment configuration
//! - [`logs`] - Leveled console logging

// Core modules
pub mod error;
pub mod models;
pub mod config;
pub mod logs;

// Reading
pub mod normalize;
pub mod parser;
pub mod validation;

// Units
pub mod batch;

// Transfer
pub mod transport;
pub mod pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    ImportError,
    ImportResult,
    ReadError,
    TransportError,
};

// =============================================================================
// Re-exports - Models & Config
// =============================================================================

pub use models::{CanonicalField, CanonicalRecord, Sector};
pub use config::Config;

// =============================================================================
// Re-exports - Reading
// =============================================================================

pub use normalize::{normalize_header, HeaderMap, HeaderNormalizer, SynonymTable};

pub use parser::{
    read_csv_file,
    read_csv_bytes,
    detect_encoding,
    detect_delimiter,
    decode_content,
    ParseResult,
    ReadOptions,
    TextEncoding,
};

pub use parser::blocks::{read_block_file, read_header_file, HeaderSource};

pub use validation::FieldCoverage;

// =============================================================================
// Re-exports - Units & Transfer
// =============================================================================

pub use batch::{discover_blocks, partition, Batch, BlockFile, OrdinalWindow};

pub use transport::{ImportClient, UnitSink};

pub use pipeline::{
    run_block_import,
    run_datalake_upload,
    run_file_import,
    RunOptions,
    RunResult,
    UnitFailure,
};
