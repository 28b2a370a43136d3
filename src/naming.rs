// Object naming: which key each local file is stored under, and which
// content type it is sent with.

use std::path::{Component, Path};

use crate::walk::DiscoveredFile;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Remote key for `file`.
///
/// `pathname` is only honoured when `single_file` is set, i.e. the whole
/// batch is one file passed directly. Files found under a directory are
/// keyed by their path relative to that directory, with `/` separators.
/// Anything else is keyed by its base name.
pub fn object_key(file: &DiscoveredFile, pathname: Option<&str>, single_file: bool) -> String {
    if let (Some(pathname), true, None) = (pathname, single_file, &file.root) {
        return pathname.to_string();
    }

    if let Some(rel) = file.root.as_ref().and_then(|root| file.path.strip_prefix(root).ok()) {
        let key = slash_path(rel);
        if !key.is_empty() {
            return key;
        }
    }

    file.path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| slash_path(&file.path))
}

/// Join the normal components of `path` with `/`.
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Content type for `path`, looked up by extension. Unknown extensions
/// are sent as opaque binary.
pub fn content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn direct(path: &str) -> DiscoveredFile {
        DiscoveredFile {
            root: None,
            path: PathBuf::from(path),
        }
    }

    fn under(root: &str, path: &str) -> DiscoveredFile {
        DiscoveredFile {
            root: Some(PathBuf::from(root)),
            path: PathBuf::from(path),
        }
    }

    #[test]
    fn single_file_uses_base_name() {
        assert_eq!(object_key(&direct("/home/me/docs/report.pdf"), None, true), "report.pdf");
        assert_eq!(object_key(&direct("/tmp/a.tar.gz"), None, false), "a.tar.gz");
    }

    #[test]
    fn single_file_honours_pathname() {
        let file = direct("/home/me/report.pdf");
        assert_eq!(object_key(&file, Some("reports/2024/q1.pdf"), true), "reports/2024/q1.pdf");
    }

    #[test]
    fn pathname_ignored_for_multi_file_batches() {
        let file = direct("/home/me/report.pdf");
        assert_eq!(object_key(&file, Some("renamed.pdf"), false), "report.pdf");
    }

    #[test]
    fn directory_files_keep_relative_structure() {
        let file = under("/srv/site", "/srv/site/assets/img/logo.png");
        assert_eq!(object_key(&file, None, false), "assets/img/logo.png");
        assert_eq!(object_key(&under("/srv/site", "/srv/site/index.html"), None, false), "index.html");
    }

    #[test]
    fn pathname_ignored_for_directory_files() {
        let file = under("/srv/site", "/srv/site/css/main.css");
        assert_eq!(object_key(&file, Some("override.css"), true), "css/main.css");
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type(Path::new("a/index.html")), "text/html");
        assert_eq!(content_type(Path::new("logo.PNG")), "image/png");
        assert_eq!(content_type(Path::new("data.json")), "application/json");
    }

    #[test]
    fn unknown_extension_is_opaque_binary() {
        assert_eq!(content_type(Path::new("blob.zzzunknown")), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type(Path::new("Makefile")), DEFAULT_CONTENT_TYPE);
    }
}
