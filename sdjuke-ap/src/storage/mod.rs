//! Storage volume access
//!
//! The navigator and the playback controller only see the volume through
//! the [`Storage`] trait: list a directory, open a file for sequential
//! reading, check that a path still exists. `FsStorage` maps this onto the
//! local filesystem; `MemoryStorage` is an in-memory tree used as a test
//! volume by the crate's own tests and integration tests.

pub mod memory;

pub use memory::MemoryStorage;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::trace;

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// One directory entry: bare name plus kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }
}

/// Read-only view of a mounted volume
pub trait Storage {
    type File: Read;

    /// Entries of `path` in the volume's native order (not sorted)
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    fn open(&self, path: &Path) -> io::Result<Self::File>;

    fn exists(&self, path: &Path) -> bool;
}

/// Local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    type File = File;

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();

        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();

            // Follow symlinks so a linked file or folder counts as what it
            // points to; dangling links become Other
            let kind = match std::fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => EntryKind::File,
                Ok(meta) if meta.is_dir() => EntryKind::Directory,
                Ok(_) => EntryKind::Other,
                Err(e) => {
                    trace!("Cannot stat {}: {}", entry.path().display(), e);
                    EntryKind::Other
                }
            };

            entries.push(DirEntry { name, kind });
        }

        Ok(entries)
    }

    fn open(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_fs_storage_lists_kinds() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mp3"), b"x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut entries = FsStorage.read_dir(dir.path()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            entries,
            vec![DirEntry::file("a.mp3"), DirEntry::directory("sub")]
        );
    }

    #[test]
    fn test_fs_storage_open_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.mp3");
        fs::write(&path, b"abc").unwrap();

        let mut contents = Vec::new();
        FsStorage.open(&path).unwrap().read_to_end(&mut contents).unwrap();

        assert_eq!(contents, b"abc");
        assert!(FsStorage.exists(&path));
        assert!(!FsStorage.exists(&dir.path().join("missing.mp3")));
        assert!(FsStorage.read_dir(&dir.path().join("missing")).is_err());
    }
}
