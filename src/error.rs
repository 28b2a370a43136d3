// Error taxonomy for the library. Fatal errors (configuration, listing)
// abort the command; per-entry errors (enumeration, transfer) are
// collected into batch reports and never stop the rest of the batch.

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;

use crate::config::TOKEN_ENV;

/// Configuration could not be resolved. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "Vercel token is missing. Please set the {} environment variable.",
        TOKEN_ENV
    )]
    MissingToken,

    #[error("invalid blob API url {url:?}: {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

/// Failure talking to the remote blob store.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{status}: {message}")]
    Status {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status(),
            ApiError::Decode(_) => None,
        }
    }
}

/// A user-supplied path could not be expanded into files.
#[derive(Debug, thiserror::Error)]
pub enum EnumerateError {
    #[error("Path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a regular file or directory: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Error processing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One file's upload or download failed. The batch carries on.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Upload(#[source] ApiError),

    #[error("{0}")]
    Download(#[source] ApiError),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("refusing to write object {0:?} outside the output directory")]
    UnsafeKey(String),
}

/// The remote listing failed, so a download cannot proceed.
#[derive(Debug, thiserror::Error)]
#[error("Error downloading files: {0}")]
pub struct ListingError(#[from] pub ApiError);

/// A download command could not run at all.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Listing(#[from] ListingError),

    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to resolve the current directory: {0}")]
    CurrentDir(#[source] io::Error),
}
