// Upload orchestration: enumerate the inputs, name each file, read it
// and put it in the store. Every file gets its own result; one failure
// never stops the batch.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::api::{Access, BlobStore, PutOptions};
use crate::error::{EnumerateError, TransferError};
use crate::fs::FileSystem;
use crate::naming::{content_type, object_key};
use crate::walk::{enumerate, DiscoveredFile};

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Key override for a batch made of a single file.
    pub pathname: Option<String>,
    pub multipart: bool,
}

/// A single file ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub local_path: PathBuf,
    pub remote_key: String,
    pub content_type: String,
    pub multipart: bool,
}

impl UploadRequest {
    pub fn new(file: &DiscoveredFile, options: &UploadOptions, single_file: bool) -> Self {
        UploadRequest {
            local_path: file.path.clone(),
            remote_key: object_key(file, options.pathname.as_deref(), single_file),
            content_type: content_type(&file.path),
            multipart: options.multipart,
        }
    }
}

/// Where an uploaded object can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub url: String,
    pub download_url: String,
}

#[derive(Debug)]
pub struct UploadResult {
    pub local_path: PathBuf,
    pub remote_key: String,
    pub outcome: Result<Uploaded, TransferError>,
}

/// Progress notifications, in processing order.
#[derive(Debug)]
pub enum UploadEvent<'a> {
    /// `--pathname` was given but the batch is not a single file.
    PathnameIgnored,
    /// About to send a file.
    Started(&'a UploadRequest),
    /// An input could not be expanded and was skipped.
    Skipped(&'a EnumerateError),
    /// `path` maps to a key an earlier file in this batch already used.
    /// The upload still goes ahead and replaces that object.
    KeyCollision {
        key: &'a str,
        path: &'a Path,
        previous: &'a Path,
    },
    Finished(&'a UploadResult),
}

#[derive(Debug, Default)]
pub struct UploadReport {
    pub results: Vec<UploadResult>,
    pub skipped: Vec<EnumerateError>,
}

impl UploadReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &UploadResult> {
        self.results.iter().filter(|r| r.outcome.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &UploadResult> {
        self.results.iter().filter(|r| r.outcome.is_err())
    }
}

pub struct Uploader<'a, S: ?Sized, F: ?Sized> {
    store: &'a S,
    fs: &'a F,
    options: UploadOptions,
}

impl<'a, S, F> Uploader<'a, S, F>
where
    S: BlobStore + ?Sized,
    F: FileSystem + ?Sized,
{
    pub fn new(store: &'a S, fs: &'a F, options: UploadOptions) -> Self {
        Uploader { store, fs, options }
    }

    /// Upload everything `inputs` expands to, one file at a time.
    /// `on_event` sees each step as it happens.
    pub fn run<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        mut on_event: impl FnMut(UploadEvent<'_>),
    ) -> io::Result<UploadReport> {
        let single_input = inputs.len() == 1;
        let mut pathname_pending = self.options.pathname.is_some();
        if pathname_pending && !single_input {
            on_event(UploadEvent::PathnameIgnored);
            pathname_pending = false;
        }

        let mut report = UploadReport::default();
        // Remote key -> local path that first claimed it.
        let mut issued: HashMap<String, PathBuf> = HashMap::new();
        for item in enumerate(self.fs, inputs)? {
            let file = match item {
                Ok(file) => file,
                Err(e) => {
                    on_event(UploadEvent::Skipped(&e));
                    report.skipped.push(e);
                    continue;
                }
            };
            if pathname_pending && file.root.is_some() {
                on_event(UploadEvent::PathnameIgnored);
                pathname_pending = false;
            }

            let request = UploadRequest::new(&file, &self.options, single_input);
            match issued.get(&request.remote_key) {
                Some(previous) => on_event(UploadEvent::KeyCollision {
                    key: &request.remote_key,
                    path: &request.local_path,
                    previous,
                }),
                None => {
                    issued.insert(request.remote_key.clone(), request.local_path.clone());
                }
            }
            on_event(UploadEvent::Started(&request));
            let result = UploadResult {
                outcome: self.upload(&request),
                local_path: request.local_path,
                remote_key: request.remote_key,
            };
            on_event(UploadEvent::Finished(&result));
            report.results.push(result);
        }
        Ok(report)
    }

    /// Read and send one file.
    pub fn upload(&self, request: &UploadRequest) -> Result<Uploaded, TransferError> {
        let body = self
            .fs
            .read(&request.local_path)
            .map_err(|source| TransferError::Read {
                path: request.local_path.clone(),
                source,
            })?;
        debug!(
            key = %request.remote_key,
            content_type = %request.content_type,
            size = body.len(),
            "uploading"
        );

        let options = PutOptions {
            content_type: request.content_type.clone(),
            access: Access::Public,
            multipart: request.multipart,
            add_random_suffix: false,
        };
        let put = self
            .store
            .put(&request.remote_key, body, &options)
            .map_err(TransferError::Upload)?;
        Ok(Uploaded {
            url: put.url,
            download_url: put.download_url,
        })
    }
}
