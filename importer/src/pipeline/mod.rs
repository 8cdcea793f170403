//! Run controller for the three transfer pipelines.
//!
//! ```text
//! import-file    CSV ──▶ records ──▶ batches ──▶ POST /api/sectors/import
//! import-blocks  header.csv + block_*.csv ──▶ records ──▶ POST /api/sectors/import
//! upload-blocks  header.csv + block_*.csv ──▶ POST /api/luci/datalake (raw files)
//! ```
//!
//! Units run strictly in ordinal order, one at a time, with a fixed pause
//! between them. A failed unit is recorded and the run moves on; only
//! configuration and source-level problems abort, and they do so before
//! the first unit is attempted.

pub mod report;
pub mod resume;

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::batch::{discover_blocks, partition, select_window, BlockFile, OrdinalWindow};
use crate::error::{ConfigError, ImportError, ImportResult, ReadError};
use crate::logs::{log_error_indent, log_info, log_info_indent, log_success, log_warning};
use crate::models::Sector;
use crate::parser::blocks::{read_block_file, read_header_file, DEFAULT_HEADER_FILE};
use crate::parser::{format_delimiter, read_csv_file, ReadOptions, TextEncoding};
use crate::transport::{ImportRequest, UnitSink, UploadRequest};
use crate::validation::FieldCoverage;
use resume::ResumeCommand;

/// Pause between units unless overridden.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// `source` tag sent with every import batch unless overridden.
pub const DEFAULT_SOURCE: &str = "usbizdata_import";

/// Unmapped header names listed before the rest are summarized.
const MAX_UNMAPPED_SHOWN: usize = 10;

// =============================================================================
// Options & Result
// =============================================================================

/// Settings shared by every pipeline.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub sector: Sector,
    pub window: OrdinalWindow,
    pub delay: Duration,
    /// Read and plan, but never call the sink.
    pub dry_run: bool,
    pub source: String,
    /// Already-quoted client flags (`--team`, `--api-url`, ...) appended to
    /// every resume hint.
    pub resume_args: Vec<String>,
}

impl RunOptions {
    pub fn new(sector: Sector) -> Self {
        Self {
            sector,
            window: OrdinalWindow::default(),
            delay: DEFAULT_DELAY,
            dry_run: false,
            source: DEFAULT_SOURCE.to_string(),
            resume_args: Vec::new(),
        }
    }

    pub fn with_window(mut self, window: OrdinalWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_resume_args(mut self, args: Vec<String>) -> Self {
        self.resume_args = args;
        self
    }
}

/// A unit that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    pub ordinal: usize,
    pub label: String,
    pub error: String,
}

/// Counters for one run. Built at the start, updated once per unit, read
/// only for the final report.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub sector: Sector,
    pub started_at: String,
    pub dry_run: bool,
    /// Units in the whole source.
    pub units_total: usize,
    /// Units inside the requested window.
    pub units_selected: usize,
    pub units_processed: usize,
    pub units_succeeded: usize,
    pub records_read: usize,
    pub records_sent: usize,
    pub records_acknowledged: u64,
    /// Rows rejected by the CSV reader.
    pub skipped_rows: usize,
    /// Datalake runs only: whether the header file went up.
    pub header_uploaded: Option<bool>,
    pub failures: Vec<UnitFailure>,
    pub elapsed: Duration,
    /// Command that re-runs this exact import; `--start` / `--end` are
    /// appended per failed unit.
    pub resume_command: String,
}

impl RunResult {
    pub fn new(sector: Sector, dry_run: bool, units_total: usize, units_selected: usize) -> Self {
        Self {
            sector,
            started_at: chrono::Utc::now().to_rfc3339(),
            dry_run,
            units_total,
            units_selected,
            units_processed: 0,
            units_succeeded: 0,
            records_read: 0,
            records_sent: 0,
            records_acknowledged: 0,
            skipped_rows: 0,
            header_uploaded: None,
            failures: Vec::new(),
            elapsed: Duration::ZERO,
            resume_command: String::new(),
        }
    }

    /// Failed ordinals in the order they ran.
    pub fn failed_ordinals(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.ordinal).collect()
    }

    pub fn units_failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty() && self.header_uploaded != Some(false)
    }
}

// =============================================================================
// Run Loop
// =============================================================================

/// Per-run bookkeeping shared by the pipelines.
struct RunLoop<'a> {
    options: &'a RunOptions,
    result: RunResult,
    started: Instant,
    last_ordinal: usize,
}

impl<'a> RunLoop<'a> {
    fn new(
        options: &'a RunOptions,
        units_total: usize,
        selected: &std::ops::RangeInclusive<usize>,
        resume: ResumeCommand,
    ) -> Self {
        let mut result = RunResult::new(
            options.sector,
            options.dry_run,
            units_total,
            selected.end() - selected.start() + 1,
        );
        result.resume_command = resume.extend(&options.resume_args).render();

        Self {
            options,
            result,
            started: Instant::now(),
            last_ordinal: *selected.end(),
        }
    }

    fn succeed(&mut self, ordinal: usize, acknowledged: u64) {
        self.result.units_processed += 1;
        self.result.units_succeeded += 1;
        self.result.records_acknowledged += acknowledged;
        log_success(format!("Unit {} done ({} acknowledged)", ordinal, acknowledged));
    }

    fn planned(&mut self, ordinal: usize, records: usize) {
        self.result.units_processed += 1;
        log_info_indent(format!("Unit {}: {} records ready (dry run)", ordinal, records), 1);
    }

    fn fail(&mut self, ordinal: usize, label: &str, error: impl fmt::Display) {
        self.result.units_processed += 1;
        let error = error.to_string();
        log_error_indent(format!("Unit {} ({}) failed: {}", ordinal, label, error), 1);
        self.result.failures.push(UnitFailure {
            ordinal,
            label: label.to_string(),
            error,
        });
    }

    /// Sleep after every unit, whatever its outcome, except the last of the
    /// window. Dry runs never sleep.
    async fn pause_after(&self, ordinal: usize) {
        if self.options.dry_run || ordinal >= self.last_ordinal || self.options.delay.is_zero() {
            return;
        }
        tokio::time::sleep(self.options.delay).await;
    }

    fn finish(mut self) -> RunResult {
        self.result.elapsed = self.started.elapsed();

        // Summary lines use non-info levels so `--quiet` keeps them.
        log_info("");
        for line in report::summary_lines(&self.result, &self.result.resume_command) {
            if self.result.is_complete_success() {
                log_success(line);
            } else {
                log_warning(line);
            }
        }

        self.result
    }
}

fn log_plan(kind: &str, total: usize, range: &std::ops::RangeInclusive<usize>, options: &RunOptions) {
    log_info(format!(
        "Plan: {} {} {}-{} of {} for sector {}{}",
        range.end() - range.start() + 1,
        kind,
        range.start(),
        range.end(),
        total,
        options.sector,
        if options.dry_run { " (dry run)" } else { "" }
    ));
    if !options.dry_run && !options.delay.is_zero() {
        log_info_indent(format!("Delay between units: {:.1}s", options.delay.as_secs_f64()), 1);
    }
}

fn log_unmapped(unmapped: &[&str]) {
    if unmapped.is_empty() {
        return;
    }
    let shown: Vec<&str> = unmapped.iter().take(MAX_UNMAPPED_SHOWN).copied().collect();
    let rest = unmapped.len().saturating_sub(MAX_UNMAPPED_SHOWN);
    log_warning(format!(
        "{} unmapped column(s) ignored: {}{}",
        unmapped.len(),
        shown.join(", "),
        if rest > 0 { format!(" ... and {} more", rest) } else { String::new() }
    ));
}

fn log_coverage(coverage: &FieldCoverage) {
    if coverage.records == 0 {
        return;
    }
    log_info(format!("Field coverage over {} records:", coverage.records));
    for line in coverage.lines() {
        log_info_indent(line, 1);
    }
    for warning in coverage.warnings() {
        log_warning(warning);
    }
}

fn require_folder(folder: &Path) -> Result<(), ConfigError> {
    if !folder.exists() {
        return Err(ConfigError::MissingPath(folder.to_path_buf()));
    }
    if !folder.is_dir() {
        return Err(ConfigError::NotADirectory(folder.to_path_buf()));
    }
    Ok(())
}

fn header_path(folder: &Path, header: Option<&Path>) -> PathBuf {
    header
        .map(Path::to_path_buf)
        .unwrap_or_else(|| folder.join(DEFAULT_HEADER_FILE))
}

fn discover_units(folder: &Path) -> ImportResult<Vec<BlockFile>> {
    let blocks = discover_blocks(folder)?;
    if blocks.is_empty() {
        return Err(ImportError::NoUnits(folder.to_path_buf()));
    }
    Ok(blocks)
}

// =============================================================================
// Pipelines
// =============================================================================

/// Read one CSV export, cut it into batches of `chunk_size` and import the
/// batches in the window.
pub async fn run_file_import<S: UnitSink>(
    sink: &S,
    path: &Path,
    read_options: &ReadOptions,
    chunk_size: usize,
    options: &RunOptions,
) -> ImportResult<RunResult> {
    if chunk_size == 0 {
        return Err(ConfigError::InvalidChunkSize.into());
    }
    if !path.is_file() {
        return Err(ConfigError::MissingPath(path.to_path_buf()).into());
    }

    log_info(format!("Reading {}", path.display()));
    let parsed = read_csv_file(path, read_options)?;

    log_info_indent(format!("Encoding: {}", parsed.encoding), 1);
    log_info_indent(format!("Delimiter: '{}'", format_delimiter(parsed.delimiter)), 1);
    log_info_indent(
        format!(
            "Columns: {} ({} mapped)",
            parsed.header_map.len(),
            parsed.header_map.mapped_count()
        ),
        1,
    );
    log_unmapped(&parsed.header_map.unmapped());
    log_info_indent(
        format!(
            "Rows: {} read, {} records, {} empty, {} skipped",
            parsed.stats.rows_read,
            parsed.records.len(),
            parsed.stats.empty_rows,
            parsed.stats.skipped_rows
        ),
        1,
    );
    if parsed.stats.skipped_rows > 0 {
        log_warning(format!("{} malformed row(s) skipped", parsed.stats.skipped_rows));
    }

    if parsed.records.is_empty() {
        return Err(ImportError::NoRecords(path.to_path_buf()));
    }

    log_coverage(&FieldCoverage::from_records(&parsed.records));

    let batches = partition(parsed.records, chunk_size)?;
    let total = batches.len();
    let range = options.window.resolve(total)?;
    let selected = select_window(batches, &range);

    log_plan("batches", total, &range, options);

    let resume = ResumeCommand::new("import-file", path, options.sector)
        .chunk_size(chunk_size)
        .read_flags(read_options, &ReadOptions::single_file())
        .source(&options.source)
        .delay(options.delay);

    let mut run = RunLoop::new(options, total, &range, resume);
    run.result.skipped_rows = parsed.stats.skipped_rows;

    for batch in selected {
        let ordinal = batch.ordinal();
        run.result.records_read += batch.len();

        if options.dry_run {
            run.planned(ordinal, batch.len());
            continue;
        }

        log_info(format!("[{}/{}] Sending {} records", ordinal, total, batch.len()));
        let request = ImportRequest {
            sector_id: options.sector,
            records: batch.records(),
            source: &options.source,
            chunk: ordinal,
            total_chunks: total,
        };

        run.result.records_sent += batch.len();
        match sink.import(&request).await {
            Ok(ack) => run.succeed(ordinal, ack.imported),
            Err(e) => run.fail(ordinal, &format!("batch {}", ordinal), e),
        }

        run.pause_after(ordinal).await;
    }

    Ok(run.finish())
}

/// Import a folder of data-only block files described by one header file.
pub async fn run_block_import<S: UnitSink>(
    sink: &S,
    folder: &Path,
    header: Option<&Path>,
    read_options: &ReadOptions,
    options: &RunOptions,
) -> ImportResult<RunResult> {
    require_folder(folder)?;

    let source = read_header_file(&header_path(folder, header), read_options)?;
    log_info(format!("Header: {}", source.path.display()));
    log_info_indent(
        format!("Encoding: {} (blocks: {})", source.encoding, source.block_encoding),
        1,
    );
    log_info_indent(format!("Delimiter: '{}'", format_delimiter(source.delimiter)), 1);
    log_info_indent(
        format!(
            "Columns: {} ({} mapped)",
            source.header_map.len(),
            source.header_map.mapped_count()
        ),
        1,
    );
    log_unmapped(&source.header_map.unmapped());

    let blocks = discover_units(folder)?;
    let total = blocks.len();
    let range = options.window.resolve(total)?;
    let selected = select_window(blocks, &range);

    log_plan("blocks", total, &range, options);

    let mut resume = ResumeCommand::new("import-blocks", folder, options.sector);
    if let Some(header) = header {
        resume = resume.arg("--header", header.display());
    }
    let resume = resume
        .read_flags(read_options, &ReadOptions::block())
        .source(&options.source)
        .delay(options.delay);

    let mut run = RunLoop::new(options, total, &range, resume);
    let mut coverage = FieldCoverage::new();

    for block in selected {
        let ordinal = block.ordinal;
        log_info(format!("[{}/{}] {}", ordinal, total, block.name));

        let read = match read_block_file(&block.path, &source, read_options) {
            Ok(read) => read,
            Err(e) => {
                run.fail(ordinal, &block.name, e);
                run.pause_after(ordinal).await;
                continue;
            }
        };

        if read.duplicate_header {
            log_warning(format!(
                "{} starts with a repeated header row; it is imported as data",
                block.name
            ));
        }
        if read.stats.skipped_rows > 0 {
            log_warning(format!(
                "{}: {} malformed row(s) skipped",
                block.name, read.stats.skipped_rows
            ));
        }

        if source.block_encoding == TextEncoding::Auto {
            log_info_indent(format!("Encoding: {}", read.encoding), 1);
        }

        run.result.skipped_rows += read.stats.skipped_rows;
        run.result.records_read += read.records.len();
        coverage.add_all(&read.records);

        if read.records.is_empty() {
            log_warning(format!("{} has no records; nothing to send", block.name));
            if options.dry_run {
                run.planned(ordinal, 0);
            } else {
                run.succeed(ordinal, 0);
            }
            run.pause_after(ordinal).await;
            continue;
        }

        if options.dry_run {
            run.planned(ordinal, read.records.len());
            continue;
        }

        log_info_indent(format!("Sending {} records", read.records.len()), 1);
        let request = ImportRequest {
            sector_id: options.sector,
            records: &read.records,
            source: &options.source,
            chunk: ordinal,
            total_chunks: total,
        };

        run.result.records_sent += read.records.len();
        match sink.import(&request).await {
            Ok(ack) => run.succeed(ordinal, ack.imported),
            Err(e) => run.fail(ordinal, &block.name, e),
        }

        run.pause_after(ordinal).await;
    }

    log_coverage(&coverage);

    Ok(run.finish())
}

/// Upload the header file, then each raw block file, to the datalake.
pub async fn run_datalake_upload<S: UnitSink>(
    sink: &S,
    folder: &Path,
    header: Option<&Path>,
    skip_header: bool,
    options: &RunOptions,
) -> ImportResult<RunResult> {
    require_folder(folder)?;

    let header_file = header_path(folder, header);
    if !skip_header && !header_file.is_file() {
        return Err(ReadError::MissingHeaderFile(header_file).into());
    }

    let blocks = discover_units(folder)?;
    let total = blocks.len();
    let range = options.window.resolve(total)?;
    let selected = select_window(blocks, &range);

    log_plan("blocks", total, &range, options);

    // Resumed runs never re-send the header.
    let mut resume = ResumeCommand::new("upload-blocks", folder, options.sector);
    if let Some(header) = header {
        resume = resume.arg("--header", header.display());
    }
    let resume = resume.switch("--skip-header").delay(options.delay);

    let mut run = RunLoop::new(options, total, &range, resume);

    if !skip_header {
        let name = header_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_HEADER_FILE.to_string());

        if options.dry_run {
            log_info_indent(
                format!("Header {} ({} bytes) would be uploaded first", name, file_size(&header_file)),
                1,
            );
        } else {
            log_info(format!("[0/{}] {} (header)", total, name));
            let request = UploadRequest {
                sector: options.sector,
                path: &header_file,
                is_header: true,
            };
            match sink.upload(&request).await {
                Ok(_) => {
                    run.result.header_uploaded = Some(true);
                    log_success("Header uploaded");
                }
                Err(e) => {
                    run.result.header_uploaded = Some(false);
                    log_warning(format!("Header upload failed: {}; continuing with blocks", e));
                }
            }
            if !options.delay.is_zero() {
                tokio::time::sleep(options.delay).await;
            }
        }
    }

    for block in selected {
        let ordinal = block.ordinal;
        let size = file_size(&block.path);

        if options.dry_run {
            run.result.units_processed += 1;
            log_info_indent(format!("Unit {}: {} ({} bytes)", ordinal, block.name, size), 1);
            continue;
        }

        log_info(format!("[{}/{}] {} ({} bytes)", ordinal, total, block.name, size));
        let request = UploadRequest {
            sector: options.sector,
            path: &block.path,
            is_header: false,
        };

        match sink.upload(&request).await {
            Ok(ack) => {
                let records = ack.records.unwrap_or(0);
                if let Some(path) = ack.path {
                    log_info_indent(format!("Stored at {}", path), 1);
                }
                run.succeed(ordinal, records);
            }
            Err(e) => run.fail(ordinal, &block.name, e),
        }

        run.pause_after(ordinal).await;
    }

    Ok(run.finish())
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TransportError, TransportResult};
    use crate::logs::warned;
    use crate::transport::{ImportAck, UploadAck};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every call and fails the listed ordinals.
    #[derive(Default)]
    struct FakeSink {
        fail_chunks: Vec<usize>,
        fail_files: Vec<String>,
        imports: Mutex<Vec<(usize, usize, usize)>>,
        uploads: Mutex<Vec<(String, bool)>>,
    }

    impl FakeSink {
        fn failing(chunks: &[usize]) -> Self {
            Self {
                fail_chunks: chunks.to_vec(),
                ..Self::default()
            }
        }

        fn import_calls(&self) -> Vec<(usize, usize, usize)> {
            self.imports.lock().unwrap().clone()
        }

        fn upload_calls(&self) -> Vec<(String, bool)> {
            self.uploads.lock().unwrap().clone()
        }
    }

    impl UnitSink for FakeSink {
        async fn import(&self, request: &ImportRequest<'_>) -> TransportResult<ImportAck> {
            self.imports.lock().unwrap().push((
                request.chunk,
                request.total_chunks,
                request.records.len(),
            ));
            if self.fail_chunks.contains(&request.chunk) {
                return Err(TransportError::Status {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(ImportAck {
                imported: request.records.len() as u64,
            })
        }

        async fn upload(&self, request: &UploadRequest<'_>) -> TransportResult<UploadAck> {
            let name = request
                .path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned();
            self.uploads.lock().unwrap().push((name.clone(), request.is_header));
            if self.fail_files.contains(&name) {
                return Err(TransportError::Request("connection reset".into()));
            }
            Ok(UploadAck {
                records: Some(2),
                path: Some(format!("datalake/{}", name)),
            })
        }
    }

    fn options() -> RunOptions {
        RunOptions::new(Sector::Realtors).with_delay(Duration::ZERO)
    }

    fn write_csv(dir: &TempDir, rows: usize) -> PathBuf {
        let mut content = String::from("Company Name,Phone,Zip Code\n");
        for i in 0..rows {
            content.push_str(&format!("Company {i},555-{i:04},{:05}\n", 10000 + i));
        }
        let path = dir.path().join("export.csv");
        fs::write(&path, content).unwrap();
        path
    }

    fn write_blocks(dir: &TempDir, blocks: usize) {
        fs::write(dir.path().join("header.csv"), "Company Name,Phone\n").unwrap();
        for i in 1..=blocks {
            fs::write(
                dir.path().join(format!("block_{i:04}.csv")),
                format!("Acme {i},555-000{i}\nBeta {i},555-100{i}\n"),
            )
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_file_import_sends_every_batch() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, 25);
        let sink = FakeSink::default();

        let result = run_file_import(&sink, &path, &ReadOptions::single_file(), 10, &options())
            .await
            .unwrap();

        assert_eq!(sink.import_calls(), vec![(1, 3, 10), (2, 3, 10), (3, 3, 5)]);
        assert_eq!(result.units_total, 3);
        assert_eq!(result.units_succeeded, 3);
        assert_eq!(result.records_read, 25);
        assert_eq!(result.records_sent, 25);
        assert_eq!(result.records_acknowledged, 25);
        assert!(result.is_complete_success());
    }

    #[tokio::test]
    async fn test_failed_units_are_reported_exactly() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, 10);
        let sink = FakeSink::failing(&[3, 7]);

        let result = run_file_import(&sink, &path, &ReadOptions::single_file(), 1, &options())
            .await
            .unwrap();

        assert_eq!(sink.import_calls().len(), 10);
        assert_eq!(result.failed_ordinals(), vec![3, 7]);
        assert_eq!(result.units_processed, 10);
        assert_eq!(result.units_succeeded, 8);
        assert_eq!(result.records_acknowledged, 8);
        assert!(result.failures[0].error.contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_resume_hint_reproduces_the_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Vendor Export.csv");
        fs::write(&path, "Company Name,Phone\nAcme,555-0001\nBeta,555-0002\n").unwrap();
        let sink = FakeSink::failing(&[2]);

        let read = ReadOptions::single_file()
            .with_encoding(TextEncoding::Windows1252)
            .with_keep_name_parts(true);
        let options = options().with_resume_args(vec!["--team".into(), "'team 7'".into()]);

        let result = run_file_import(&sink, &path, &read, 1, &options).await.unwrap();

        let quoted = format!("'{}'", path.display());
        assert!(result.resume_command.starts_with(&format!("bizimport import-file {quoted} --sector realtors")));
        assert!(result.resume_command.contains("--chunk-size 1"));
        assert!(result.resume_command.contains("--encoding windows-1252"));
        assert!(result.resume_command.contains("--name-parts keep"));
        assert!(result.resume_command.contains("--delay 0"));
        assert!(result.resume_command.ends_with("--team 'team 7'"));

        let summary = report::summary_lines(&result, &result.resume_command).join("\n");
        assert!(summary.contains(&format!("{} --start 2 --end 2", result.resume_command)));
    }

    #[tokio::test]
    async fn test_upload_resume_hint_skips_header() {
        let dir = TempDir::new().unwrap();
        write_blocks(&dir, 2);
        let sink = FakeSink {
            fail_files: vec!["block_0002.csv".into()],
            ..FakeSink::default()
        };

        let result = run_datalake_upload(&sink, dir.path(), None, false, &options())
            .await
            .unwrap();

        assert_eq!(result.failed_ordinals(), vec![2]);
        assert!(result.resume_command.contains(" upload-blocks "));
        assert!(result.resume_command.contains("--skip-header"));
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_calls_and_same_counts() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, 23);

        let live_sink = FakeSink::default();
        let live = run_file_import(&live_sink, &path, &ReadOptions::single_file(), 5, &options())
            .await
            .unwrap();

        let dry_sink = FakeSink::default();
        let dry = run_file_import(
            &dry_sink,
            &path,
            &ReadOptions::single_file(),
            5,
            &options().with_dry_run(true).with_delay(Duration::from_secs(30)),
        )
        .await
        .unwrap();

        assert!(dry_sink.import_calls().is_empty());
        assert!(dry.dry_run);
        assert_eq!(dry.units_total, live.units_total);
        assert_eq!(dry.units_processed, live.units_processed);
        assert_eq!(dry.records_read, live.records_read);
        assert_eq!(dry.records_sent, 0);
        assert!(dry.elapsed < Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_window_limits_units_and_keeps_ordinals() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, 50);
        let sink = FakeSink::default();

        let result = run_file_import(
            &sink,
            &path,
            &ReadOptions::single_file(),
            10,
            &options().with_window(OrdinalWindow::new(4, 0)),
        )
        .await
        .unwrap();

        assert_eq!(sink.import_calls(), vec![(4, 5, 10), (5, 5, 10)]);
        assert_eq!(result.units_selected, 2);
        assert_eq!(result.records_read, 20);
    }

    #[tokio::test]
    async fn test_invalid_window_is_fatal_before_any_call() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, 10);
        let sink = FakeSink::default();

        let err = run_file_import(
            &sink,
            &path,
            &ReadOptions::single_file(),
            5,
            &options().with_window(OrdinalWindow::new(3, 0)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ImportError::Config(ConfigError::InvalidWindow { .. })));
        assert!(sink.import_calls().is_empty());
    }

    #[tokio::test]
    async fn test_zero_records_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "Company,Phone\n,\n").unwrap();

        let err = run_file_import(&FakeSink::default(), &path, &ReadOptions::single_file(), 5, &options())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::NoRecords(_)));
    }

    #[tokio::test]
    async fn test_zero_chunk_size_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, 3);

        let err = run_file_import(&FakeSink::default(), &path, &ReadOptions::single_file(), 0, &options())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Config(ConfigError::InvalidChunkSize)));
    }

    #[tokio::test]
    async fn test_no_delay_after_last_unit() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, 2);
        let delay = Duration::from_millis(400);

        let result = run_file_import(
            &FakeSink::default(),
            &path,
            &ReadOptions::single_file(),
            1,
            &options().with_delay(delay),
        )
        .await
        .unwrap();

        assert_eq!(result.units_processed, 2);
        assert!(result.elapsed >= delay);
        assert!(result.elapsed < delay * 2);
    }

    #[tokio::test]
    async fn test_single_unit_window_never_sleeps() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, 5);
        let delay = Duration::from_millis(400);

        let result = run_file_import(
            &FakeSink::default(),
            &path,
            &ReadOptions::single_file(),
            1,
            &options().with_delay(delay).with_window(OrdinalWindow::new(3, 3)),
        )
        .await
        .unwrap();

        assert_eq!(result.units_processed, 1);
        assert!(result.elapsed < delay);
    }

    #[tokio::test]
    async fn test_block_window_delay_stops_at_window_end() {
        let dir = TempDir::new().unwrap();
        write_blocks(&dir, 4);
        let sink = FakeSink::default();
        let delay = Duration::from_millis(400);

        let result = run_block_import(
            &sink,
            dir.path(),
            None,
            &ReadOptions::block(),
            &options().with_delay(delay).with_window(OrdinalWindow::new(2, 3)),
        )
        .await
        .unwrap();

        assert_eq!(sink.import_calls(), vec![(2, 4, 2), (3, 4, 2)]);
        assert!(result.elapsed >= delay);
        assert!(result.elapsed < delay * 2);
    }

    #[tokio::test]
    async fn test_empty_block_is_followed_by_delay() {
        let dir = TempDir::new().unwrap();
        write_blocks(&dir, 2);
        fs::write(dir.path().join("block_0001.csv"), ",\n").unwrap();
        let sink = FakeSink::default();
        let delay = Duration::from_millis(400);

        let result = run_block_import(
            &sink,
            dir.path(),
            None,
            &ReadOptions::block(),
            &options().with_delay(delay),
        )
        .await
        .unwrap();

        assert_eq!(sink.import_calls(), vec![(2, 2, 2)]);
        assert!(result.elapsed >= delay);
        assert!(result.elapsed < delay * 2);
    }

    #[tokio::test]
    async fn test_block_import_uses_block_ordinals() {
        let dir = TempDir::new().unwrap();
        write_blocks(&dir, 3);
        let sink = FakeSink::failing(&[2]);

        let result = run_block_import(&sink, dir.path(), None, &ReadOptions::block(), &options())
            .await
            .unwrap();

        assert_eq!(sink.import_calls(), vec![(1, 3, 2), (2, 3, 2), (3, 3, 2)]);
        assert_eq!(result.failed_ordinals(), vec![2]);
        assert_eq!(result.failures[0].label, "block_0002.csv");
        assert_eq!(result.records_read, 6);
        assert_eq!(result.records_acknowledged, 4);
    }

    #[tokio::test]
    async fn test_empty_block_succeeds_without_call() {
        let dir = TempDir::new().unwrap();
        write_blocks(&dir, 2);
        fs::write(dir.path().join("block_0003.csv"), ",\n,\n").unwrap();
        let sink = FakeSink::default();

        let result = run_block_import(&sink, dir.path(), None, &ReadOptions::block(), &options())
            .await
            .unwrap();

        assert_eq!(sink.import_calls().len(), 2);
        assert_eq!(result.units_succeeded, 3);
        assert!(result.failures.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_header_in_block_is_warned() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("header.csv"), "Company Name,Phone\n").unwrap();
        fs::write(
            dir.path().join("block_7731.csv"),
            "company name,phone\nAcme,555\n",
        )
        .unwrap();
        let sink = FakeSink::default();

        let result = run_block_import(&sink, dir.path(), None, &ReadOptions::block(), &options())
            .await
            .unwrap();

        assert!(warned("block_7731.csv starts with a repeated header row"));
        assert_eq!(result.records_read, 2);
    }

    #[tokio::test]
    async fn test_block_import_requires_header_and_blocks() {
        let dir = TempDir::new().unwrap();
        let sink = FakeSink::default();

        let err = run_block_import(&sink, dir.path(), None, &ReadOptions::block(), &options())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Read(ReadError::MissingHeaderFile(_))));

        fs::write(dir.path().join("header.csv"), "Company\n").unwrap();
        let err = run_block_import(&sink, dir.path(), None, &ReadOptions::block(), &options())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::NoUnits(_)));

        let err = run_block_import(
            &sink,
            &dir.path().join("missing"),
            None,
            &ReadOptions::block(),
            &options(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ImportError::Config(ConfigError::MissingPath(_))));
    }

    #[tokio::test]
    async fn test_datalake_uploads_header_first() {
        let dir = TempDir::new().unwrap();
        write_blocks(&dir, 2);
        let sink = FakeSink::default();

        let result = run_datalake_upload(&sink, dir.path(), None, false, &options())
            .await
            .unwrap();

        assert_eq!(
            sink.upload_calls(),
            vec![
                ("header.csv".to_string(), true),
                ("block_0001.csv".to_string(), false),
                ("block_0002.csv".to_string(), false),
            ]
        );
        assert_eq!(result.header_uploaded, Some(true));
        assert_eq!(result.units_succeeded, 2);
        assert_eq!(result.records_acknowledged, 4);
    }

    #[tokio::test]
    async fn test_datalake_header_failure_does_not_stop_blocks() {
        let dir = TempDir::new().unwrap();
        write_blocks(&dir, 2);
        let sink = FakeSink {
            fail_files: vec!["header.csv".into(), "block_0002.csv".into()],
            ..FakeSink::default()
        };

        let result = run_datalake_upload(&sink, dir.path(), None, false, &options())
            .await
            .unwrap();

        assert_eq!(sink.upload_calls().len(), 3);
        assert_eq!(result.header_uploaded, Some(false));
        assert_eq!(result.failed_ordinals(), vec![2]);
        assert!(!result.is_complete_success());
    }

    #[tokio::test]
    async fn test_datalake_skip_header_and_dry_run() {
        let dir = TempDir::new().unwrap();
        write_blocks(&dir, 3);
        fs::remove_file(dir.path().join("header.csv")).unwrap();

        let sink = FakeSink::default();
        let result = run_datalake_upload(&sink, dir.path(), None, true, &options())
            .await
            .unwrap();
        assert_eq!(sink.upload_calls().len(), 3);
        assert!(sink.upload_calls().iter().all(|(_, is_header)| !is_header));
        assert_eq!(result.header_uploaded, None);

        let dry_sink = FakeSink::default();
        let dry = run_datalake_upload(&dry_sink, dir.path(), None, true, &options().with_dry_run(true))
            .await
            .unwrap();
        assert!(dry_sink.upload_calls().is_empty());
        assert_eq!(dry.units_processed, 3);

        let err = run_datalake_upload(&dry_sink, dir.path(), None, false, &options())
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Read(ReadError::MissingHeaderFile(_))));
    }
}
