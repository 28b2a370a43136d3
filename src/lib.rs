// Library root
// -----------
// This crate exposes the library surface behind the `blob-cli` binary.
// `main.rs` parses the command line and wires these modules together.
//
// Module responsibilities:
// - `config`: resolves the bearer token and API endpoint once, up front.
// - `fs` / `walk`: filesystem seam and lazy expansion of input paths.
// - `naming`: remote keys and content types for local files.
// - `api`: blocking HTTP client for the blob store.
// - `upload` / `download`: batch orchestration with per-file results.
// - `ui`: terminal output for both commands.
pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod naming;
pub mod ui;
pub mod upload;
pub mod walk;

#[cfg(test)]
mod testing;

use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber. Quiet unless `RUST_LOG` asks for more.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}
