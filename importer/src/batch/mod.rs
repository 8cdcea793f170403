//! Splitting work into transfer units.
//!
//! Single-file runs cut their records into [`Batch`]es; block runs use the
//! block files found on disk as their units. Either way every unit has a
//! 1-based ordinal, and an [`OrdinalWindow`] selects the sub-range to
//! process so a failed run can be resumed.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ReadError, ReadResult};
use crate::models::CanonicalRecord;

/// Records per batch for single-file imports.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

static BLOCK_FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^block_\d+\.csv$").expect("block file pattern is valid")
});

// =============================================================================
// Batches
// =============================================================================

/// A bounded slice of records for one JSON transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    ordinal: usize,
    total: usize,
    records: Vec<CanonicalRecord>,
}

impl Batch {
    /// 1-based position in the run.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Number of batches in the full run.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Cut records into consecutive batches of `size`; only the last may be
/// shorter.
pub fn partition(records: Vec<CanonicalRecord>, size: usize) -> Result<Vec<Batch>, ConfigError> {
    if size == 0 {
        return Err(ConfigError::InvalidChunkSize);
    }

    let total = records.len().div_ceil(size);
    let mut remaining = records.into_iter();

    let batches = (1..=total)
        .map(|ordinal| Batch {
            ordinal,
            total,
            records: remaining.by_ref().take(size).collect(),
        })
        .collect();

    Ok(batches)
}

// =============================================================================
// Ordinal Window
// =============================================================================

/// Operator-selected `[start, end]` range; `end == 0` means "through the
/// last unit".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdinalWindow {
    pub start: usize,
    pub end: usize,
}

impl Default for OrdinalWindow {
    fn default() -> Self {
        Self { start: 1, end: 0 }
    }
}

impl OrdinalWindow {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Resolve against `total` units. `end` past the last unit is clamped.
    pub fn resolve(&self, total: usize) -> Result<RangeInclusive<usize>, ConfigError> {
        let end = if self.end == 0 { total } else { self.end.min(total) };

        if self.start == 0 || self.start > end {
            return Err(ConfigError::InvalidWindow {
                start: self.start,
                end: self.end,
                total,
            });
        }
        Ok(self.start..=end)
    }
}

/// Keep the units whose 1-based position falls inside `range`.
pub fn select_window<T>(units: Vec<T>, range: &RangeInclusive<usize>) -> Vec<T> {
    units
        .into_iter()
        .enumerate()
        .filter(|(i, _)| range.contains(&(i + 1)))
        .map(|(_, unit)| unit)
        .collect()
}

// =============================================================================
// Block Discovery
// =============================================================================

/// One pre-chunked block file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFile {
    pub ordinal: usize,
    pub name: String,
    pub path: PathBuf,
}

pub fn is_block_file_name(name: &str) -> bool {
    BLOCK_FILE_NAME.is_match(name)
}

/// List `block_<n>.csv` files in `folder`, sorted by file name.
pub fn discover_blocks(folder: &Path) -> ReadResult<Vec<BlockFile>> {
    let entries = std::fs::read_dir(folder).map_err(|e| ReadError::io(folder, e))?;

    let mut found: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            is_block_file_name(&name).then(|| (name, entry.path()))
        })
        .collect();

    found.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(found
        .into_iter()
        .enumerate()
        .map(|(i, (name, path))| BlockFile {
            ordinal: i + 1,
            name,
            path,
        })
        .collect())
}
