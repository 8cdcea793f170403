//! Wire types for the ingestion and datalake endpoints.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::{CanonicalRecord, Sector};

/// JSON body for `POST /api/sectors/import`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest<'a> {
    pub sector_id: Sector,
    pub records: &'a [CanonicalRecord],
    pub source: &'a str,
    pub chunk: usize,
    pub total_chunks: usize,
}

/// One raw file for `POST /api/luci/datalake`.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub sector: Sector,
    pub path: &'a Path,
    pub is_header: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ImportResponse {
    #[serde(default)]
    pub imported: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DatalakeResponse {
    #[serde(default)]
    pub uploaded: Option<UploadAck>,
}

/// Successful import acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportAck {
    pub imported: u64,
}

/// Successful upload acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadAck {
    #[serde(default)]
    pub records: Option<u64>,
    #[serde(default)]
    pub path: Option<String>,
}
