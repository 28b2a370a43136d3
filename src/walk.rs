// Path enumeration: expands user-supplied paths into the flat list of
// files to upload. Directories are walked lazily, depth first, with each
// directory's entries visited in sorted name order.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::EnumerateError;
use crate::fs::{absolutize, EntryKind, FileSystem};

/// A file found while expanding the inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// The directory argument the file was found under, `None` when the
    /// file itself was passed on the command line.
    pub root: Option<PathBuf>,
    pub path: PathBuf,
}

/// Lazy recursive listing of the regular files beneath a directory.
/// Each directory is entered at most once, so symlink cycles terminate.
pub struct Walk<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    // Reversed, so `pop` yields paths in visiting order.
    stack: Vec<PathBuf>,
    // Canonical paths of directories already entered.
    entered: HashSet<PathBuf>,
}

impl<'a, F: FileSystem + ?Sized> Walk<'a, F> {
    pub fn new(fs: &'a F, dir: &Path) -> Self {
        Walk {
            fs,
            stack: vec![dir.to_path_buf()],
            entered: HashSet::new(),
        }
    }

    fn push_children(&mut self, dir: &Path) -> Result<(), EnumerateError> {
        let mut children = self.fs.read_dir(dir).map_err(|source| EnumerateError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        children.sort();
        self.stack.extend(children.into_iter().rev());
        Ok(())
    }
}

impl<F: FileSystem + ?Sized> Iterator for Walk<'_, F> {
    type Item = Result<PathBuf, EnumerateError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(path) = self.stack.pop() {
            match self.fs.kind(&path) {
                Ok(Some(EntryKind::File)) => return Some(Ok(path)),
                Ok(Some(EntryKind::Dir)) => {
                    let canonical = match self.fs.canonicalize(&path) {
                        Ok(canonical) => canonical,
                        Err(source) => return Some(Err(EnumerateError::Io { path, source })),
                    };
                    if !self.entered.insert(canonical) {
                        debug!(path = %path.display(), "skipping already visited directory");
                        continue;
                    }
                    if let Err(e) = self.push_children(&path) {
                        return Some(Err(e));
                    }
                }
                Ok(Some(EntryKind::Other)) => {
                    debug!(path = %path.display(), "skipping non-regular file");
                }
                // Removed mid-walk, or a dangling symlink.
                Ok(None) => debug!(path = %path.display(), "skipping vanished entry"),
                Err(source) => return Some(Err(EnumerateError::Io { path, source })),
            }
        }
        None
    }
}

/// Lazy expansion of a list of user-supplied paths. Missing paths and
/// unreadable directories come out as errors in place; the remaining
/// inputs are still expanded.
pub struct Enumerate<'a, F: FileSystem + ?Sized, I> {
    fs: &'a F,
    cwd: PathBuf,
    inputs: I,
    current: Option<(PathBuf, Walk<'a, F>)>,
}

/// Expand `inputs` against the filesystem. Relative paths are resolved
/// against the current directory.
pub fn enumerate<F, I>(fs: &F, inputs: I) -> io::Result<Enumerate<'_, F, I::IntoIter>>
where
    F: FileSystem + ?Sized,
    I: IntoIterator,
    I::Item: AsRef<Path>,
{
    Ok(Enumerate {
        fs,
        cwd: fs.current_dir()?,
        inputs: inputs.into_iter(),
        current: None,
    })
}

impl<'a, F, I> Iterator for Enumerate<'a, F, I>
where
    F: FileSystem + ?Sized,
    I: Iterator,
    I::Item: AsRef<Path>,
{
    type Item = Result<DiscoveredFile, EnumerateError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((root, walk)) = &mut self.current {
                match walk.next() {
                    Some(Ok(path)) => {
                        return Some(Ok(DiscoveredFile {
                            root: Some(root.clone()),
                            path,
                        }))
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => self.current = None,
                }
                continue;
            }

            let input = self.inputs.next()?;
            let path = absolutize(&self.cwd, input.as_ref());
            match self.fs.kind(&path) {
                Ok(None) => return Some(Err(EnumerateError::NotFound(path))),
                Ok(Some(EntryKind::Dir)) => {
                    let walk = Walk::new(self.fs, &path);
                    self.current = Some((path, walk));
                }
                Ok(Some(EntryKind::File)) => return Some(Ok(DiscoveredFile { root: None, path })),
                Ok(Some(EntryKind::Other)) => return Some(Err(EnumerateError::NotAFile(path))),
                Err(source) => return Some(Err(EnumerateError::Io { path, source })),
            }
        }
    }
}
