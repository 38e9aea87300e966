//! Filesystem capability.
//!
//! The engine never touches `std::fs` directly; every read, write, and
//! freshness check goes through the [`FileStore`] trait. [`OsFileStore`] is
//! the real implementation; [`MemStore`] is an in-memory store useful for
//! tests and for fully in-memory template setups.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

/// Filesystem operations the engine depends on.
///
/// Writes are whole-file replacements: a reader either sees the previous
/// content or the new content, never a partial write.
pub trait FileStore {
    /// Reads an entire file as UTF-8 text.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Replaces a file's content atomically.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Last modification time of a file.
    fn mtime(&self, path: &Path) -> io::Result<SystemTime>;

    /// Whether the path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Whether an existing file can be opened for reading.
    fn is_readable(&self, path: &Path) -> bool;

    /// Whether files can be created in the given directory.
    fn is_writable(&self, dir: &Path) -> bool;

    /// Deletes a file.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Resolves a path to a canonical absolute form. Fails when the path
    /// does not exist.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// [`FileStore`] backed by the operating system.
///
/// Writes go to a temporary file in the target directory and are renamed
/// into place, so concurrent readers never observe a half-written cache
/// file.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileStore;

impl FileStore for OsFileStore {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn mtime(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_readable(&self, path: &Path) -> bool {
        fs::File::open(path).is_ok()
    }

    fn is_writable(&self, dir: &Path) -> bool {
        fs::metadata(dir)
            .map(|m| !m.permissions().readonly())
            .unwrap_or(false)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}

#[derive(Debug)]
struct MemFile {
    contents: String,
    mtime: SystemTime,
}

#[derive(Debug, Default)]
struct MemInner {
    files: HashMap<PathBuf, MemFile>,
    unreadable: HashSet<PathBuf>,
    unwritable: HashSet<PathBuf>,
}

/// An in-memory [`FileStore`].
///
/// Cloning produces a second handle onto the same store, so a test can keep
/// one handle while the engine owns the other.
///
/// # Example
///
/// ```rust
/// use embrace::{FileStore, MemStore};
/// use std::path::Path;
///
/// let store = MemStore::new();
/// store.insert("/tpl/page.tpl", "Hi [[name]]!");
/// assert!(store.exists(Path::new("/tpl/page.tpl")));
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemStore {
    inner: Rc<RefCell<MemInner>>,
}

impl MemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file, stamped with the current time.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.inner.borrow_mut().files.insert(
            path.into(),
            MemFile {
                contents: contents.into(),
                mtime: SystemTime::now(),
            },
        );
    }

    /// Overrides a file's modification time. Lets tests age a cache file
    /// without sleeping.
    pub fn set_mtime(&self, path: impl AsRef<Path>, mtime: SystemTime) {
        if let Some(file) = self.inner.borrow_mut().files.get_mut(path.as_ref()) {
            file.mtime = mtime;
        }
    }

    /// Marks a file as present but unreadable.
    pub fn deny_read(&self, path: impl Into<PathBuf>) {
        self.inner.borrow_mut().unreadable.insert(path.into());
    }

    /// Marks a directory as unwritable.
    pub fn deny_write(&self, dir: impl Into<PathBuf>) {
        self.inner.borrow_mut().unwritable.insert(dir.into());
    }

    /// Returns a file's content, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.inner
            .borrow()
            .files
            .get(path.as_ref())
            .map(|f| f.contents.clone())
    }
}

impl FileStore for MemStore {
    fn read(&self, path: &Path) -> io::Result<String> {
        let inner = self.inner.borrow();
        if inner.unreadable.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        inner
            .files
            .get(path)
            .map(|f| f.contents.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not found"))
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        if self.inner.borrow().unwritable.contains(dir) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        self.insert(path, contents);
        Ok(())
    }

    fn mtime(&self, path: &Path) -> io::Result<SystemTime> {
        self.inner
            .borrow()
            .files
            .get(path)
            .map(|f| f.mtime)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not found"))
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.borrow().files.contains_key(path)
    }

    fn is_readable(&self, path: &Path) -> bool {
        let inner = self.inner.borrow();
        inner.files.contains_key(path) && !inner.unreadable.contains(path)
    }

    fn is_writable(&self, dir: &Path) -> bool {
        !self.inner.borrow().unwritable.contains(dir)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.inner
            .borrow_mut()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not found"))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        if self.exists(path) {
            Ok(path.to_path_buf())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "not found"))
        }
    }
}
