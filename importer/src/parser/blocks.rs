//! Pre-chunked sources: one header file plus data-only block files.
//!
//! The header file is read once; its delimiter and [`HeaderMap`] are reused
//! for every block of the dataset. An explicit encoding applies to every
//! file; `auto` is detected per file, since header files are usually plain
//! ASCII and say nothing about the blocks.

use std::path::{Path, PathBuf};

use super::{
    collect_records, csv_reader, decode_content, detect_delimiter, header_cells, ReadOptions,
    RowStats, TextEncoding,
};
use crate::error::{ReadError, ReadResult};
use crate::models::CanonicalRecord;
use crate::normalize::HeaderMap;

/// Header file name looked up inside a block folder.
pub const DEFAULT_HEADER_FILE: &str = "header.csv";

/// Column layout shared by all blocks of one dataset.
#[derive(Debug, Clone)]
pub struct HeaderSource {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub header_map: HeaderMap,
    pub delimiter: u8,
    /// Encoding the header file was decoded with (never `Auto`).
    pub encoding: TextEncoding,
    /// Encoding applied to blocks; `Auto` means detect per block.
    pub block_encoding: TextEncoding,
}

/// Read the dedicated header file. Fatal when the file is absent or yields
/// no column names.
pub fn read_header_file(path: &Path, options: &ReadOptions) -> ReadResult<HeaderSource> {
    if !path.is_file() {
        return Err(ReadError::MissingHeaderFile(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|e| ReadError::io(path, e))?;

    let (content, encoding) = decode_content(&bytes, options.encoding);
    let delimiter = detect_delimiter(&content);

    let mut reader = csv_reader(&content, delimiter);
    let header_row = reader.records().next().ok_or(ReadError::NoHeaders)??;
    let headers = header_cells(&header_row)?;
    let header_map = options.normalizer.build(&headers);

    Ok(HeaderSource {
        path: path.to_path_buf(),
        headers,
        header_map,
        delimiter,
        encoding,
        block_encoding: match options.encoding {
            TextEncoding::Auto => TextEncoding::Auto,
            _ => encoding,
        },
    })
}

/// Records read from one block.
#[derive(Debug, Clone)]
pub struct BlockRead {
    pub records: Vec<CanonicalRecord>,
    pub stats: RowStats,
    /// Encoding the block was decoded with.
    pub encoding: TextEncoding,
    /// The first data row repeated the header labels. It is still counted
    /// and assembled as data.
    pub duplicate_header: bool,
}

pub fn read_block_file(path: &Path, source: &HeaderSource, options: &ReadOptions) -> ReadResult<BlockRead> {
    let bytes = std::fs::read(path).map_err(|e| ReadError::io(path, e))?;
    Ok(read_block_bytes(&bytes, source, options))
}

/// Read a data-only block using the shared header layout.
pub fn read_block_bytes(bytes: &[u8], source: &HeaderSource, options: &ReadOptions) -> BlockRead {
    let (content, encoding) = decode_content(bytes, source.block_encoding);

    let mut reader = csv_reader(&content, source.delimiter);
    let mut rows = reader.records().peekable();

    let duplicate_header = match (rows.peek(), source.header_map.first_label()) {
        (Some(Ok(first)), Some(label)) => first
            .get(0)
            .map(|cell| cell.trim().trim_start_matches('\u{feff}'))
            .is_some_and(|cell| !cell.is_empty() && cell.eq_ignore_ascii_case(label.trim())),
        _ => false,
    };

    let (records, stats) = collect_records(rows, &source.header_map, options.keep_name_parts);

    BlockRead {
        records,
        stats,
        encoding,
        duplicate_header,
    }
}
