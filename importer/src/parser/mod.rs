//! CSV reading with encoding and delimiter auto-detection.
//!
//! Turns vendor CSV rows into [`CanonicalRecord`]s. Row-level problems never
//! abort a read: rejected rows are counted, short rows yield partial records,
//! and rows with nothing mapped are dropped.
//!
//! Block sources (header file + data-only block files) live in [`blocks`].

pub mod blocks;

use csv::{ReaderBuilder, StringRecord};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, ReadError, ReadResult};
use crate::models::CanonicalRecord;
use crate::normalize::{HeaderMap, HeaderNormalizer, SynonymTable};

/// Bytes sampled for delimiter detection.
pub const SNIFF_BYTES: usize = 4096;

/// Delimiter used when detection finds no candidate.
pub const DEFAULT_DELIMITER: u8 = b',';

/// Candidates in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Bytes handed to chardet when the encoding is `auto`.
const ENCODING_SAMPLE_BYTES: usize = 64 * 1024;

// =============================================================================
// Encoding
// =============================================================================

/// Assumed text encoding of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Windows1252,
    Latin1,
    /// Detect per source with chardet.
    Auto,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Windows1252 => "windows-1252",
            Self::Latin1 => "iso-8859-1",
            Self::Auto => "auto",
        }
    }
}

impl FromStr for TextEncoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" | "ascii" => Ok(Self::Utf8),
            "windows-1252" | "cp1252" => Ok(Self::Windows1252),
            "iso-8859-1" | "latin-1" | "latin1" => Ok(Self::Latin1),
            "auto" => Ok(Self::Auto),
            _ => Err(ConfigError::InvalidEncoding(s.to_string())),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Guess the encoding of raw bytes. Valid UTF-8 always wins; otherwise
/// chardet decides between the single-byte Latin encodings.
pub fn detect_encoding(bytes: &[u8]) -> TextEncoding {
    let sample = &bytes[..bytes.len().min(ENCODING_SAMPLE_BYTES)];

    match std::str::from_utf8(sample) {
        Ok(_) => return TextEncoding::Utf8,
        // Sample cut through a multi-byte sequence
        Err(e) if e.error_len().is_none() => return TextEncoding::Utf8,
        Err(_) => {}
    }

    let charset = chardet::detect(sample).0;
    match charset.to_lowercase().as_str() {
        "windows-1252" | "cp1252" => TextEncoding::Windows1252,
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => TextEncoding::Latin1,
        _ => TextEncoding::Utf8,
    }
}

/// Decode bytes, dropping a UTF-8 BOM and replacing malformed sequences
/// with U+FFFD. Returns the text and the encoding actually used.
pub fn decode_content(bytes: &[u8], encoding: TextEncoding) -> (String, TextEncoding) {
    let resolved = match encoding {
        TextEncoding::Auto => detect_encoding(bytes),
        other => other,
    };

    let text = match resolved {
        TextEncoding::Utf8 | TextEncoding::Auto => encoding_rs::UTF_8.decode_with_bom_removal(bytes).0,
        TextEncoding::Windows1252 => encoding_rs::WINDOWS_1252.decode_with_bom_removal(bytes).0,
        // WHATWG maps the iso-8859-1 label onto windows-1252
        TextEncoding::Latin1 => encoding_rs::WINDOWS_1252.decode_with_bom_removal(bytes).0,
    };

    (text.into_owned(), resolved)
}

// =============================================================================
// Delimiter Detection
// =============================================================================

/// Detect the delimiter from the first line of the first 4 KB.
///
/// Candidates (comma, tab, semicolon, pipe) are counted outside double
/// quotes; the highest count wins, ties go to the earlier candidate, and a
/// line with no candidate at all falls back to [`DEFAULT_DELIMITER`].
pub fn detect_delimiter(content: &str) -> u8 {
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;

    for (offset, c) in content.char_indices() {
        if offset >= SNIFF_BYTES {
            break;
        }
        match c {
            '"' => in_quotes = !in_quotes,
            '\n' | '\r' if !in_quotes => break,
            _ if !in_quotes => {
                if let Some(i) = CANDIDATE_DELIMITERS.iter().position(|&d| d as char == c) {
                    counts[i] += 1;
                }
            }
            _ => {}
        }
    }

    let mut best = DEFAULT_DELIMITER;
    let mut best_count = 0;
    for (i, &count) in counts.iter().enumerate() {
        if count > best_count {
            best_count = count;
            best = CANDIDATE_DELIMITERS[i];
        }
    }
    best
}

/// Format delimiter for display
pub fn format_delimiter(d: u8) -> String {
    match d {
        b'\t' => "TAB".to_string(),
        other => (other as char).to_string(),
    }
}

// =============================================================================
// Record Assembly
// =============================================================================

/// Per-pipeline reading behavior.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub normalizer: HeaderNormalizer,
    /// Keep `first_name` / `last_name` after deriving `contact_name`.
    pub keep_name_parts: bool,
    pub encoding: TextEncoding,
}

impl ReadOptions {
    /// Single large export: base synonyms, name parts dropped.
    pub fn single_file() -> Self {
        Self {
            normalizer: HeaderNormalizer::new(SynonymTable::single_file()),
            keep_name_parts: false,
            encoding: TextEncoding::Utf8,
        }
    }

    /// Header file + blocks: extended synonyms, name parts kept.
    pub fn block() -> Self {
        Self {
            normalizer: HeaderNormalizer::new(SynonymTable::block()),
            keep_name_parts: true,
            encoding: TextEncoding::Utf8,
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_keep_name_parts(mut self, keep: bool) -> Self {
        self.keep_name_parts = keep;
        self
    }
}

/// Build one record from a row's cells. `None` when nothing survived.
pub fn assemble_record<'a, I>(
    header_map: &HeaderMap,
    values: I,
    keep_name_parts: bool,
) -> Option<CanonicalRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut record = CanonicalRecord::new();

    for (i, value) in values.into_iter().enumerate() {
        if let Some(field) = header_map.target(i).and_then(|t| t.field()) {
            record.set(field, value);
        }
    }

    record.derive_contact_name(keep_name_parts);

    if record.is_empty() {
        None
    } else {
        Some(record)
    }
}

/// Row counters for one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowStats {
    /// Data rows seen, including rejected and empty ones.
    pub rows_read: usize,
    /// Rows the CSV reader could not parse.
    pub skipped_rows: usize,
    /// Rows with no populated canonical field.
    pub empty_rows: usize,
}

pub(crate) fn csv_reader(content: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
}

pub(crate) fn collect_records<I>(
    rows: I,
    header_map: &HeaderMap,
    keep_name_parts: bool,
) -> (Vec<CanonicalRecord>, RowStats)
where
    I: Iterator<Item = Result<StringRecord, csv::Error>>,
{
    let mut records = Vec::new();
    let mut stats = RowStats::default();

    for row in rows {
        stats.rows_read += 1;
        match row {
            Ok(row) => match assemble_record(header_map, row.iter(), keep_name_parts) {
                Some(record) => records.push(record),
                None => stats.empty_rows += 1,
            },
            Err(_) => stats.skipped_rows += 1,
        }
    }

    (records, stats)
}

pub(crate) fn header_cells(row: &StringRecord) -> ReadResult<Vec<String>> {
    let headers: Vec<String> = row
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(ReadError::NoHeaders);
    }
    Ok(headers)
}

// =============================================================================
// Single-file Sources
// =============================================================================

/// Result of reading a single CSV export.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub records: Vec<CanonicalRecord>,
    pub header_map: HeaderMap,
    pub encoding: TextEncoding,
    pub delimiter: u8,
    pub stats: RowStats,
}

/// Read a CSV file whose first row is the header row.
pub fn read_csv_file<P: AsRef<Path>>(path: P, options: &ReadOptions) -> ReadResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| ReadError::io(path, e))?;
    read_csv_bytes(&bytes, options)
}

/// Read CSV bytes whose first row is the header row.
pub fn read_csv_bytes(bytes: &[u8], options: &ReadOptions) -> ReadResult<ParseResult> {
    let (content, encoding) = decode_content(bytes, options.encoding);
    let delimiter = detect_delimiter(&content);

    let mut reader = csv_reader(&content, delimiter);
    let mut rows = reader.records();

    let header_row = rows.next().ok_or(ReadError::EmptyFile)??;
    let headers = header_cells(&header_row)?;
    let header_map = options.normalizer.build(&headers);

    let (records, stats) = collect_records(rows, &header_map, options.keep_name_parts);

    Ok(ParseResult {
        records,
        header_map,
        encoding,
        delimiter,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CanonicalField;

    fn read(csv: &str) -> ParseResult {
        read_csv_bytes(csv.as_bytes(), &ReadOptions::single_file()).unwrap()
    }

    #[test]
    fn test_detect_delimiter_candidates() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), b'|');
    }

    #[test]
    fn test_detect_delimiter_ignores_quoted_separators() {
        assert_eq!(detect_delimiter("\"Smith, Jones; Co\";Phone;Zip\n"), b';');
    }

    #[test]
    fn test_detect_delimiter_falls_back_to_comma() {
        assert_eq!(detect_delimiter("single_column\nvalue"), b',');
        assert_eq!(detect_delimiter(""), b',');
    }

    #[test]
    fn test_detect_delimiter_tie_prefers_comma() {
        assert_eq!(detect_delimiter("a,b;c"), b',');
    }

    #[test]
    fn test_detect_delimiter_only_samples_first_4kb() {
        let mut content = "x".repeat(SNIFF_BYTES);
        content.push_str(";;;;");
        assert_eq!(detect_delimiter(&content), DEFAULT_DELIMITER);
    }

    #[test]
    fn test_decode_strips_bom() {
        let bytes = b"\xEF\xBB\xBFCompany,Phone\nAcme,1";
        let (text, encoding) = decode_content(bytes, TextEncoding::Utf8);
        assert!(text.starts_with("Company"));
        assert_eq!(encoding, TextEncoding::Utf8);
    }

    #[test]
    fn test_decode_replaces_invalid_bytes() {
        let bytes: &[u8] = &[b'A', b'c', 0xFF, b'e'];
        let (text, _) = decode_content(bytes, TextEncoding::Utf8);
        assert_eq!(text, "Ac\u{FFFD}e");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let (text, _) = decode_content(bytes, TextEncoding::Latin1);
        assert_eq!(text, "Société");
    }

    #[test]
    fn test_latin1_keeps_iso_8859_1_symbols() {
        // 0xA4 is the currency sign in ISO-8859-1 and the euro in ISO-8859-15
        let (text, _) = decode_content(&[0xA4, b'5', 0xBD], TextEncoding::Latin1);
        assert_eq!(text, "¤5½");
    }

    #[test]
    fn test_detect_encoding_prefers_utf8() {
        assert_eq!(detect_encoding("Café,Zürich".as_bytes()), TextEncoding::Utf8);
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!("UTF8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!("latin1".parse::<TextEncoding>().unwrap(), TextEncoding::Latin1);
        assert_eq!("auto".parse::<TextEncoding>().unwrap(), TextEncoding::Auto);
        assert!("ebcdic".parse::<TextEncoding>().is_err());
        assert!("iso-8859-15".parse::<TextEncoding>().is_err());
    }

    #[test]
    fn test_read_maps_headers_and_trims() {
        let result = read("Company Name;Phone Number;ZIP\n  Acme Co ; 555-1212 ;90210\n");

        assert_eq!(result.delimiter, b';');
        assert_eq!(result.records.len(), 1);
        let record = &result.records[0];
        assert_eq!(record.get(CanonicalField::Company), Some("Acme Co"));
        assert_eq!(record.get(CanonicalField::Phone), Some("555-1212"));
        assert_eq!(record.get(CanonicalField::Zip), Some("90210"));
    }

    #[test]
    fn test_all_empty_rows_are_dropped() {
        let result = read("Company,Phone\n,\n\"\",\"  \"\nAcme,\n");

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.stats.empty_rows, 2);
    }

    #[test]
    fn test_unmapped_columns_are_not_carried() {
        let result = read("Company,Fax\nAcme,555-9999\n,555-0000\n");

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].len(), 1);
        assert_eq!(result.header_map.unmapped(), vec!["Fax"]);
    }

    #[test]
    fn test_ragged_rows_yield_partial_records() {
        let result = read("Company,Phone,City\nAcme\nBeta,555,Austin,extra,cells\n");

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].len(), 1);
        assert_eq!(result.records[1].get(CanonicalField::City), Some("Austin"));
    }

    #[test]
    fn test_quoted_values_with_delimiters_and_newlines() {
        let result = read("Company,Address\n\"Smith, Jones & Co\",\"12 Main St\nSuite 4\"\n");

        assert_eq!(result.records.len(), 1);
        assert_eq!(
            result.records[0].get(CanonicalField::Company),
            Some("Smith, Jones & Co")
        );
        assert_eq!(
            result.records[0].get(CanonicalField::Address),
            Some("12 Main St\nSuite 4")
        );
    }

    #[test]
    fn test_single_file_drops_name_parts() {
        let result = read("First Name,Last Name,Company\nJane,Doe,Acme\n,Doe,Beta\n");

        let first = &result.records[0];
        assert_eq!(first.get(CanonicalField::ContactName), Some("Jane Doe"));
        assert!(!first.contains(CanonicalField::FirstName));
        assert_eq!(result.records[1].get(CanonicalField::ContactName), Some("Doe"));
    }

    #[test]
    fn test_keep_name_parts_option() {
        let options = ReadOptions::single_file().with_keep_name_parts(true);
        let result = read_csv_bytes(b"First Name,Last Name\nJane,Doe\n", &options).unwrap();

        let record = &result.records[0];
        assert_eq!(record.get(CanonicalField::ContactName), Some("Jane Doe"));
        assert_eq!(record.get(CanonicalField::FirstName), Some("Jane"));
    }

    #[test]
    fn test_bom_prefixed_header_is_mapped() {
        let result = read_csv_bytes(
            b"\xEF\xBB\xBFCompany,Phone\nAcme,555\n",
            &ReadOptions::single_file(),
        )
        .unwrap();
        assert_eq!(result.header_map.unmapped(), Vec::<&str>::new());
        assert_eq!(result.records[0].get(CanonicalField::Company), Some("Acme"));
    }

    #[test]
    fn test_empty_csv_error() {
        let result = read_csv_bytes(b"", &ReadOptions::single_file());
        assert!(matches!(result, Err(ReadError::EmptyFile)));
    }

    #[test]
    fn test_blank_header_row_error() {
        let result = read_csv_bytes(b" , ,\n1,2,3\n", &ReadOptions::single_file());
        assert!(matches!(result, Err(ReadError::NoHeaders)));
    }

    #[test]
    fn test_read_csv_file_missing() {
        let result = read_csv_file("/definitely/not/here.csv", &ReadOptions::single_file());
        assert!(matches!(result, Err(ReadError::Io { .. })));
    }
}
