// UI layer: turns upload/download events into terminal output.
// Results go to stdout, failures and warnings to stderr, and a spinner
// on stderr shows what is in flight.

use std::io::{self, Stderr, Stdout, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::download::DownloadEvent;
use crate::error::TransferError;
use crate::upload::UploadEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Local path, URL and download URL for every upload.
    Verbose,
    /// One bare URL per successful upload, nothing else on stdout.
    UrlsOnly,
}

pub struct Reporter<O: Write, E: Write> {
    mode: OutputMode,
    out: O,
    err: E,
    progress: ProgressBar,
}

impl Reporter<Stdout, Stderr> {
    /// Report to the process's stdout and stderr. The spinner only shows
    /// in verbose mode, and only when stderr is a terminal.
    pub fn stdio(mode: OutputMode) -> Self {
        let progress = match mode {
            OutputMode::Verbose => spinner(),
            OutputMode::UrlsOnly => ProgressBar::hidden(),
        };
        Reporter::new(mode, io::stdout(), io::stderr(), progress)
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

impl<O: Write, E: Write> Reporter<O, E> {
    pub fn new(mode: OutputMode, out: O, err: E, progress: ProgressBar) -> Self {
        Reporter {
            mode,
            out,
            err,
            progress,
        }
    }

    pub fn upload_event(&mut self, event: UploadEvent<'_>) -> io::Result<()> {
        match event {
            UploadEvent::PathnameIgnored => self.warn(
                "--pathname only applies when uploading a single file; using file names instead",
            ),
            UploadEvent::Started(request) => {
                self.progress
                    .set_message(format!("Uploading {}...", request.remote_key));
                Ok(())
            }
            UploadEvent::Skipped(e) => self.error(format_args!("{e}")),
            UploadEvent::KeyCollision {
                key,
                path,
                previous,
            } => self.warn(&format!(
                "{} overwrites {} at key {key}",
                path.display(),
                previous.display()
            )),
            UploadEvent::Finished(result) => match (&result.outcome, self.mode) {
                (Ok(uploaded), OutputMode::UrlsOnly) => self.print(format_args!("{}", uploaded.url)),
                (Ok(uploaded), OutputMode::Verbose) => self.print(format_args!(
                    "File uploaded successfully: {}\nURL: {}\nDownload URL: {}",
                    result.local_path.display(),
                    uploaded.url,
                    uploaded.download_url,
                )),
                (Err(e), _) => self.error(format_args!(
                    "Error uploading file {}: {e}",
                    result.local_path.display()
                )),
            },
        }
    }

    pub fn download_event(&mut self, event: DownloadEvent<'_>) -> io::Result<()> {
        match event {
            DownloadEvent::Listed(0) => self.print(format_args!("No files found in blob storage")),
            DownloadEvent::Listed(count) => {
                self.progress
                    .set_message(format!("Downloading {count} files..."));
                Ok(())
            }
            DownloadEvent::Finished(result) => match &result.outcome {
                Ok(_) => self.print(format_args!("Downloaded: {}", result.key)),
                Err(e @ TransferError::Download(_)) => {
                    self.error(format_args!("Failed to download: {} ({e})", result.key))
                }
                Err(e) => self.error(format_args!("Error downloading {}: {e}", result.key)),
            },
        }
    }

    pub fn download_complete(&mut self) -> io::Result<()> {
        self.print(format_args!("Download complete!"))
    }

    pub fn warn(&mut self, message: &str) -> io::Result<()> {
        self.error(format_args!("Warning: {message}"))
    }

    /// Stop the spinner and flush both streams.
    pub fn finish(&mut self) -> io::Result<()> {
        self.progress.finish_and_clear();
        self.out.flush()?;
        self.err.flush()
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }

    fn print(&mut self, line: std::fmt::Arguments<'_>) -> io::Result<()> {
        let out = &mut self.out;
        self.progress.suspend(|| writeln!(out, "{line}"))
    }

    fn error(&mut self, line: std::fmt::Arguments<'_>) -> io::Result<()> {
        let err = &mut self.err;
        self.progress.suspend(|| writeln!(err, "{line}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::download::DownloadResult;
    use crate::error::{ApiError, EnumerateError};
    use crate::upload::{UploadResult, Uploaded};

    fn reporter(mode: OutputMode) -> Reporter<Vec<u8>, Vec<u8>> {
        Reporter::new(mode, Vec::new(), Vec::new(), ProgressBar::hidden())
    }

    fn output(reporter: Reporter<Vec<u8>, Vec<u8>>) -> (String, String) {
        let (out, err) = reporter.into_inner();
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    fn ok(name: &str) -> UploadResult {
        UploadResult {
            local_path: PathBuf::from(format!("/work/{name}")),
            remote_key: name.to_string(),
            outcome: Ok(Uploaded {
                url: format!("https://store.test/{name}"),
                download_url: format!("https://store.test/{name}?download=1"),
            }),
        }
    }

    fn failed(name: &str) -> UploadResult {
        UploadResult {
            local_path: PathBuf::from(format!("/work/{name}")),
            remote_key: name.to_string(),
            outcome: Err(TransferError::Upload(ApiError::Decode("bad gateway".into()))),
        }
    }

    #[test]
    fn urls_only_prints_one_bare_url_per_upload() {
        let mut r = reporter(OutputMode::UrlsOnly);
        for name in ["a.txt", "b.txt", "c.txt"] {
            r.upload_event(UploadEvent::Finished(&ok(name))).unwrap();
        }
        let (out, err) = output(r);

        assert_eq!(
            out.lines().collect::<Vec<_>>(),
            [
                "https://store.test/a.txt",
                "https://store.test/b.txt",
                "https://store.test/c.txt",
            ]
        );
        assert!(err.is_empty());
    }

    #[test]
    fn verbose_prints_path_and_both_urls() {
        let mut r = reporter(OutputMode::Verbose);
        r.upload_event(UploadEvent::Finished(&ok("a.txt"))).unwrap();
        let (out, _) = output(r);

        assert_eq!(
            out,
            "File uploaded successfully: /work/a.txt\n\
             URL: https://store.test/a.txt\n\
             Download URL: https://store.test/a.txt?download=1\n"
        );
    }

    #[test]
    fn failures_go_to_stderr_in_every_mode() {
        for mode in [OutputMode::Verbose, OutputMode::UrlsOnly] {
            let mut r = reporter(mode);
            r.upload_event(UploadEvent::Finished(&failed("x.bin"))).unwrap();
            let missing = EnumerateError::NotFound(PathBuf::from("/work/nope"));
            r.upload_event(UploadEvent::Skipped(&missing)).unwrap();
            let (out, err) = output(r);

            assert!(out.is_empty());
            assert_eq!(
                err,
                "Error uploading file /work/x.bin: unexpected response: bad gateway\n\
                 Path does not exist: /work/nope\n"
            );
        }
    }

    #[test]
    fn pathname_warning_goes_to_stderr() {
        let mut r = reporter(OutputMode::UrlsOnly);
        r.upload_event(UploadEvent::PathnameIgnored).unwrap();
        let (out, err) = output(r);
        assert!(out.is_empty());
        assert!(err.starts_with("Warning: --pathname"));
    }

    #[test]
    fn key_collision_warning_goes_to_stderr() {
        for mode in [OutputMode::Verbose, OutputMode::UrlsOnly] {
            let mut r = reporter(mode);
            r.upload_event(UploadEvent::KeyCollision {
                key: "x.txt",
                path: std::path::Path::new("/work/b/x.txt"),
                previous: std::path::Path::new("/work/a/x.txt"),
            })
            .unwrap();
            let (out, err) = output(r);
            assert!(out.is_empty());
            assert_eq!(err, "Warning: /work/b/x.txt overwrites /work/a/x.txt at key x.txt\n");
        }
    }

    #[test]
    fn download_progress_lines() {
        let mut r = reporter(OutputMode::Verbose);
        r.download_event(DownloadEvent::Listed(2)).unwrap();
        let done = DownloadResult {
            key: "site/a.txt".into(),
            outcome: Ok(PathBuf::from("/out/site/a.txt")),
        };
        let gone = DownloadResult {
            key: "site/b.txt".into(),
            outcome: Err(TransferError::Download(ApiError::Decode("404".into()))),
        };
        r.download_event(DownloadEvent::Finished(&done)).unwrap();
        r.download_event(DownloadEvent::Finished(&gone)).unwrap();
        r.download_complete().unwrap();
        let (out, err) = output(r);

        assert_eq!(out, "Downloaded: site/a.txt\nDownload complete!\n");
        assert!(err.starts_with("Failed to download: site/b.txt"));
    }

    #[test]
    fn empty_listing_message() {
        let mut r = reporter(OutputMode::Verbose);
        r.download_event(DownloadEvent::Listed(0)).unwrap();
        let (out, _) = output(r);
        assert_eq!(out, "No files found in blob storage\n");
    }
}
