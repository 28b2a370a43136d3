// Download orchestration: list the store, then fetch every object and
// mirror it under the output directory, one object at a time. A failed
// object is reported and skipped; only a failed listing stops the run.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::api::{BlobStore, ListBlobResult};
use crate::error::{DownloadError, ListingError, TransferError};
use crate::fs::{absolutize, FileSystem};

/// One listed object and where it goes on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub object: ListBlobResult,
    pub destination: PathBuf,
}

#[derive(Debug)]
pub struct DownloadResult {
    pub key: String,
    /// Path written on success.
    pub outcome: Result<PathBuf, TransferError>,
}

#[derive(Debug)]
pub enum DownloadEvent<'a> {
    /// The listing came back with this many objects.
    Listed(usize),
    Finished(&'a DownloadResult),
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    /// `None` when nothing was listed and the disk was left alone.
    pub output_dir: Option<PathBuf>,
    pub results: Vec<DownloadResult>,
}

impl DownloadReport {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn failed(&self) -> impl Iterator<Item = &DownloadResult> {
        self.results.iter().filter(|r| r.outcome.is_err())
    }
}

pub struct Downloader<'a, S: ?Sized, F: ?Sized> {
    store: &'a S,
    fs: &'a F,
}

impl<'a, S, F> Downloader<'a, S, F>
where
    S: BlobStore + ?Sized,
    F: FileSystem + ?Sized,
{
    pub fn new(store: &'a S, fs: &'a F) -> Self {
        Downloader { store, fs }
    }

    /// Download every object whose key starts with `prefix` into
    /// `output_dir`.
    pub fn run(
        &self,
        prefix: Option<&str>,
        output_dir: &Path,
        mut on_event: impl FnMut(DownloadEvent<'_>),
    ) -> Result<DownloadReport, DownloadError> {
        let objects = self.store.list(prefix).map_err(ListingError)?;
        on_event(DownloadEvent::Listed(objects.len()));
        if objects.is_empty() {
            return Ok(DownloadReport::default());
        }

        let cwd = self.fs.current_dir().map_err(DownloadError::CurrentDir)?;
        let output_dir = absolutize(&cwd, output_dir);
        self.fs
            .create_dir_all(&output_dir)
            .map_err(|source| DownloadError::OutputDir {
                path: output_dir.clone(),
                source,
            })?;

        let mut report = DownloadReport {
            output_dir: Some(output_dir.clone()),
            results: Vec::with_capacity(objects.len()),
        };
        for object in objects {
            let key = object.pathname.clone();
            let outcome = destination(&output_dir, &key)
                .and_then(|destination| self.download(&DownloadTask { object, destination }));
            let result = DownloadResult { key, outcome };
            on_event(DownloadEvent::Finished(&result));
            report.results.push(result);
        }
        Ok(report)
    }

    /// Fetch one object and write it to its destination.
    pub fn download(&self, task: &DownloadTask) -> Result<PathBuf, TransferError> {
        let write_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| TransferError::Write { path, source }
        };

        // Folder placeholders have no content worth fetching.
        if task.object.pathname.ends_with('/') {
            self.fs
                .create_dir_all(&task.destination)
                .map_err(write_err(&task.destination))?;
            return Ok(task.destination.clone());
        }

        let body = self
            .store
            .fetch(&task.object.url)
            .map_err(TransferError::Download)?;
        debug!(key = %task.object.pathname, size = body.len(), "fetched");

        if let Some(parent) = task.destination.parent() {
            self.fs.create_dir_all(parent).map_err(write_err(parent))?;
        }
        self.fs
            .write(&task.destination, &body)
            .map_err(write_err(&task.destination))?;
        Ok(task.destination.clone())
    }
}

/// Local path for `key` under `output_dir`. Each `/`-separated segment
/// becomes a directory level; keys that would land outside `output_dir`
/// are refused.
pub fn destination(output_dir: &Path, key: &str) -> Result<PathBuf, TransferError> {
    let unsafe_key = || TransferError::UnsafeKey(key.to_string());
    if key.starts_with('/') || key.starts_with('\\') {
        return Err(unsafe_key());
    }

    let mut path = output_dir.to_path_buf();
    let mut depth = 0;
    for segment in key.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(unsafe_key()),
            s if s.contains('\\') || Path::new(s).has_root() => return Err(unsafe_key()),
            s => {
                path.push(s);
                depth += 1;
            }
        }
    }
    if depth == 0 {
        return Err(unsafe_key());
    }
    Ok(path)
}
