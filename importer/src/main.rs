//! bizimport CLI - push business-listing CSV exports to the ingestion API
//!
//! # Commands
//!
//! ```bash
//! bizimport import-file export.csv --sector realtors          # one big CSV, JSON batches
//! bizimport import-blocks ./blocks --sector trucking          # header.csv + block_*.csv, JSON
//! bizimport upload-blocks ./blocks --sector trucking          # raw blocks to the datalake
//! bizimport sectors                                           # list known sectors
//! ```
//!
//! Resume a partial run with `--start N` (and optionally `--end M`).

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bizimport::batch::{OrdinalWindow, DEFAULT_BATCH_SIZE};
use bizimport::logs::{log_info, LOGGER};
use bizimport::pipeline::resume::{format_seconds, shell_quote};
use bizimport::pipeline::DEFAULT_SOURCE;
use bizimport::transport::{BLOCK_TIMEOUT, FILE_TIMEOUT};
use bizimport::{
    run_block_import, run_datalake_upload, run_file_import, Config, ConfigError, ImportClient,
    ImportResult, ReadOptions, RunOptions, Sector, TextEncoding,
};

#[derive(Parser)]
#[command(name = "bizimport", version)]
#[command(about = "Normalize business-listing CSV exports and import them in resumable batches", long_about = None)]
struct Cli {
    /// Only print warnings, errors and the final summary
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every transfer command.
#[derive(Args, Debug)]
struct RunArgs {
    /// Target sector id (see `bizimport sectors`)
    #[arg(short, long)]
    sector: String,

    /// Team id sent as `x-team-id` (default: BIZIMPORT_TEAM_ID)
    #[arg(long)]
    team: Option<String>,

    /// First unit to process (1-based)
    #[arg(long, default_value_t = 1)]
    start: usize,

    /// Last unit to process, 0 for "through the end"
    #[arg(long, default_value_t = 0)]
    end: usize,

    /// Read and count only, no network calls
    #[arg(long)]
    dry_run: bool,

    /// Seconds to wait between units
    #[arg(long, default_value = "1", value_parser = parse_seconds)]
    delay: Duration,

    /// Request timeout in seconds (default: 180 for import-file, 120 otherwise)
    #[arg(long, value_parser = parse_seconds)]
    timeout: Option<Duration>,

    /// Source text encoding: utf-8, windows-1252, iso-8859-1 or auto
    #[arg(long, default_value = "utf-8")]
    encoding: String,

    /// Ingestion API base URL (default: BIZIMPORT_API_URL)
    #[arg(long)]
    api_url: Option<String>,
}

/// Whether `first_name` / `last_name` survive after `contact_name` is built.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum NameParts {
    Keep,
    Drop,
}

#[derive(Subcommand)]
enum Commands {
    /// Import one large CSV export as JSON batches
    ImportFile {
        /// Input CSV file (first row is the header)
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Records per batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        chunk_size: usize,

        /// Source tag attached to every batch
        #[arg(long, default_value = DEFAULT_SOURCE)]
        source: String,

        /// Name-part handling (default: drop)
        #[arg(long, value_enum)]
        name_parts: Option<NameParts>,
    },

    /// Import a folder of block_*.csv files described by a header file
    ImportBlocks {
        /// Folder holding the block files
        folder: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Header file (default: <folder>/header.csv)
        #[arg(long)]
        header: Option<PathBuf>,

        /// Source tag attached to every block
        #[arg(long, default_value = DEFAULT_SOURCE)]
        source: String,

        /// Name-part handling (default: keep)
        #[arg(long, value_enum)]
        name_parts: Option<NameParts>,
    },

    /// Upload raw block files to the datalake
    UploadBlocks {
        /// Folder holding the block files
        folder: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Header file (default: <folder>/header.csv)
        #[arg(long)]
        header: Option<PathBuf>,

        /// Do not upload the header file first
        #[arg(long)]
        skip_header: bool,

        /// Datalake base URL (default: BIZIMPORT_FRONT_URL)
        #[arg(long)]
        front_url: Option<String>,
    },

    /// List known sectors
    Sectors,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    LOGGER.set_quiet(cli.quiet);

    let config = Config::from_env();

    let result = match cli.command {
        Commands::ImportFile {
            input,
            run,
            chunk_size,
            source,
            name_parts,
        } => cmd_import_file(&config, &input, run, chunk_size, source, name_parts).await,

        Commands::ImportBlocks {
            folder,
            run,
            header,
            source,
            name_parts,
        } => cmd_import_blocks(&config, &folder, run, header.as_deref(), source, name_parts).await,

        Commands::UploadBlocks {
            folder,
            run,
            header,
            skip_header,
            front_url,
        } => {
            cmd_upload_blocks(
                &config,
                &folder,
                run,
                header.as_deref(),
                skip_header,
                front_url.as_deref(),
            )
            .await
        }

        Commands::Sectors => {
            cmd_sectors();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_import_file(
    config: &Config,
    input: &Path,
    run: RunArgs,
    chunk_size: usize,
    source: String,
    name_parts: Option<NameParts>,
) -> ImportResult<()> {
    require_path(input)?;
    if chunk_size == 0 {
        return Err(ConfigError::InvalidChunkSize.into());
    }

    let options = run_options(&run, None)?.with_source(source);
    let read_options = apply_name_parts(ReadOptions::single_file(), name_parts)
        .with_encoding(run.encoding.parse::<TextEncoding>()?);
    let client = client(config, &run, None, FILE_TIMEOUT)?;

    log_info(format!("Import file: {} -> {}", input.display(), options.sector.name()));
    run_file_import(&client, input, &read_options, chunk_size, &options).await?;
    Ok(())
}

async fn cmd_import_blocks(
    config: &Config,
    folder: &Path,
    run: RunArgs,
    header: Option<&Path>,
    source: String,
    name_parts: Option<NameParts>,
) -> ImportResult<()> {
    require_path(folder)?;

    let options = run_options(&run, None)?.with_source(source);
    let read_options = apply_name_parts(ReadOptions::block(), name_parts)
        .with_encoding(run.encoding.parse::<TextEncoding>()?);
    let client = client(config, &run, None, BLOCK_TIMEOUT)?;

    log_info(format!("Import blocks: {} -> {}", folder.display(), options.sector.name()));
    run_block_import(&client, folder, header, &read_options, &options).await?;
    Ok(())
}

async fn cmd_upload_blocks(
    config: &Config,
    folder: &Path,
    run: RunArgs,
    header: Option<&Path>,
    skip_header: bool,
    front_url: Option<&str>,
) -> ImportResult<()> {
    require_path(folder)?;

    let options = run_options(&run, front_url)?;
    let client = client(config, &run, front_url, BLOCK_TIMEOUT)?;

    log_info(format!("Upload blocks: {} -> {}", folder.display(), options.sector.name()));
    run_datalake_upload(&client, folder, header, skip_header, &options).await?;
    Ok(())
}

fn cmd_sectors() {
    println!("Known sectors ({}):\n", Sector::ALL.len());
    for sector in Sector::ALL {
        println!("  {:<22} {} (SIC {})", sector.id(), sector.name(), sector.sic_codes().join(", "));
    }
}

fn run_options(run: &RunArgs, front_url: Option<&str>) -> Result<RunOptions, ConfigError> {
    let sector: Sector = run.sector.parse()?;

    Ok(RunOptions::new(sector)
        .with_window(OrdinalWindow::new(run.start, run.end))
        .with_delay(run.delay)
        .with_dry_run(run.dry_run)
        .with_resume_args(client_flags(run, front_url)))
}

/// Client flags given on the command line, quoted for resume hints.
fn client_flags(run: &RunArgs, front_url: Option<&str>) -> Vec<String> {
    let mut flags = Vec::new();
    let mut push = |flag: &str, value: String| {
        flags.push(flag.to_string());
        flags.push(shell_quote(&value));
    };

    if let Some(team) = &run.team {
        push("--team", team.clone());
    }
    if let Some(url) = &run.api_url {
        push("--api-url", url.clone());
    }
    if let Some(timeout) = run.timeout {
        push("--timeout", format_seconds(timeout));
    }
    if let Some(url) = front_url {
        push("--front-url", url.to_string());
    }
    flags
}

fn client(
    config: &Config,
    run: &RunArgs,
    front_url: Option<&str>,
    default_timeout: Duration,
) -> Result<ImportClient, ConfigError> {
    let config = config
        .clone()
        .with_api_url(run.api_url.as_deref())
        .with_front_url(front_url)
        .with_team(run.team.as_deref());

    ImportClient::new(&config, run.timeout.unwrap_or(default_timeout))
}

fn apply_name_parts(options: ReadOptions, name_parts: Option<NameParts>) -> ReadOptions {
    match name_parts {
        Some(NameParts::Keep) => options.with_keep_name_parts(true),
        Some(NameParts::Drop) => options.with_keep_name_parts(false),
        None => options,
    }
}

fn require_path(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ConfigError::MissingPath(path.to_path_buf()))
    }
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", raw))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration '{}': {}", raw, e))
}
