// Entrypoint for the CLI application.
// Parses the subcommand, resolves the token before touching the disk or
// the network, then hands off to the upload or download orchestrator.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blob_cli::api::BlobClient;
use blob_cli::config::Config;
use blob_cli::download::Downloader;
use blob_cli::fs::OsFileSystem;
use blob_cli::init_tracing;
use blob_cli::ui::{OutputMode, Reporter};
use blob_cli::upload::{UploadOptions, Uploader};
use clap::{Parser, Subcommand};
use tracing::debug;

#[derive(Parser)]
#[command(name = "blob-cli", version, about = "CLI for managing Vercel Blob Storage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files to Vercel Blob Storage
    Upload {
        /// File paths or directory to upload
        #[arg(short = 'f', long = "file", value_name = "PATHS", num_args = 1.., required = true)]
        files: Vec<PathBuf>,
        /// Pathname to use for the upload (single file only)
        #[arg(short, long)]
        pathname: Option<String>,
        /// Enable multipart upload for large files
        #[arg(long)]
        multipart: bool,
        /// Show only the resulting URLs (useful for pipelines)
        #[arg(long)]
        urls_only: bool,
    },
    /// Download files from Vercel Blob Storage
    Download {
        /// Prefix to filter files
        #[arg(short, long)]
        prefix: Option<String>,
        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Real environment variables take precedence over `.env`.
    dotenvy::dotenv().ok();
    init_tracing();

    match Cli::parse().command {
        Commands::Upload {
            files,
            pathname,
            multipart,
            urls_only,
        } => {
            let mode = if urls_only {
                OutputMode::UrlsOnly
            } else {
                OutputMode::Verbose
            };
            upload(&files, UploadOptions { pathname, multipart }, mode)
        }
        Commands::Download { prefix, output } => download(prefix.as_deref(), &output),
    }
}

fn client() -> Result<BlobClient> {
    let config = Config::from_env()?;
    debug!(?config, "resolved configuration");
    BlobClient::new(&config).context("Failed to build HTTP client")
}

fn upload(files: &[PathBuf], options: UploadOptions, mode: OutputMode) -> Result<()> {
    let client = client()?;
    let fs = OsFileSystem;
    let mut reporter = Reporter::stdio(mode);

    let mut write_err: Option<io::Error> = None;
    let report = Uploader::new(&client, &fs, options)
        .run(files, |event| {
            if let Err(e) = reporter.upload_event(event) {
                write_err.get_or_insert(e);
            }
        })
        .context("Failed to resolve input paths")?;
    reporter.finish()?;
    if let Some(e) = write_err {
        return Err(e).context("Failed to write output");
    }

    debug!(
        uploaded = report.succeeded().count(),
        failed = report.failed().count(),
        skipped = report.skipped.len(),
        "upload finished"
    );
    Ok(())
}

fn download(prefix: Option<&str>, output: &Path) -> Result<()> {
    let client = client()?;
    let fs = OsFileSystem;
    let mut reporter = Reporter::stdio(OutputMode::Verbose);

    let mut write_err: Option<io::Error> = None;
    let result = Downloader::new(&client, &fs).run(prefix, output, |event| {
        if let Err(e) = reporter.download_event(event) {
            write_err.get_or_insert(e);
        }
    });
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            reporter.finish()?;
            return Err(e.into());
        }
    };
    if !report.is_empty() {
        reporter.download_complete()?;
    }
    reporter.finish()?;
    if let Some(e) = write_err {
        return Err(e).context("Failed to write output");
    }

    debug!(
        downloaded = report.results.len() - report.failed().count(),
        failed = report.failed().count(),
        "download finished"
    );
    Ok(())
}
