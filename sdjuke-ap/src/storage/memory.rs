//! In-memory storage volume
//!
//! Directory listings come back in insertion order, which stands in for the
//! unsorted native order of a real volume. Handles are counted so callers
//! can check that every opened file was closed again.

use super::{DirEntry, EntryKind, Storage};
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
enum Node {
    File(Arc<[u8]>),
    Dir { children: Vec<String>, readable: bool },
}

/// Cloneable handle to a shared in-memory tree
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    nodes: Arc<Mutex<HashMap<PathBuf, Node>>>,
    open_handles: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn nodes(&self) -> MutexGuard<'_, HashMap<PathBuf, Node>> {
        self.nodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create `path` and any missing parents as directories
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut nodes = self.nodes();
        Self::ensure_dir(&mut nodes, path.as_ref());
    }

    /// Add (or replace) a file, creating parent directories as needed
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut nodes = self.nodes();

        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            Self::ensure_dir(&mut nodes, parent);
            Self::link_child(&mut nodes, parent, name.to_string_lossy().into_owned());
        }
        let data: Vec<u8> = contents.into();
        nodes.insert(path.to_path_buf(), Node::File(data.into()));
    }

    /// Remove a file or a whole directory subtree
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut nodes = self.nodes();

        nodes.retain(|p, _| !p.starts_with(path));
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            let name = name.to_string_lossy().into_owned();
            if let Some(Node::Dir { children, .. }) = nodes.get_mut(parent) {
                children.retain(|c| *c != name);
            }
        }
    }

    /// Make listing `path` fail with `PermissionDenied`
    pub fn set_unreadable(&self, path: impl AsRef<Path>) {
        if let Some(Node::Dir { readable, .. }) = self.nodes().get_mut(path.as_ref()) {
            *readable = false;
        }
    }

    /// Files currently open
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Total successful opens
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn ensure_dir(nodes: &mut HashMap<PathBuf, Node>, path: &Path) {
        if nodes.contains_key(path) {
            return;
        }
        nodes.insert(
            path.to_path_buf(),
            Node::Dir {
                children: Vec::new(),
                readable: true,
            },
        );
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            Self::ensure_dir(nodes, parent);
            Self::link_child(nodes, parent, name.to_string_lossy().into_owned());
        }
    }

    fn link_child(nodes: &mut HashMap<PathBuf, Node>, parent: &Path, name: String) {
        if let Some(Node::Dir { children, .. }) = nodes.get_mut(parent) {
            if !children.contains(&name) {
                children.push(name);
            }
        }
    }
}

impl Storage for MemoryStorage {
    type File = MemoryFile;

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let nodes = self.nodes();
        match nodes.get(path) {
            Some(Node::Dir { readable: false, .. }) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is not readable", path.display()),
            )),
            Some(Node::Dir { children, .. }) => Ok(children
                .iter()
                .map(|name| {
                    let kind = match nodes.get(&path.join(name)) {
                        Some(Node::File(_)) => EntryKind::File,
                        Some(Node::Dir { .. }) => EntryKind::Directory,
                        None => EntryKind::Other,
                    };
                    DirEntry {
                        name: name.clone(),
                        kind,
                    }
                })
                .collect()),
            Some(Node::File(_)) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is not a directory", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )),
        }
    }

    fn open(&self, path: &Path) -> io::Result<MemoryFile> {
        match self.nodes().get(path) {
            Some(Node::File(data)) => {
                self.open_handles.fetch_add(1, Ordering::SeqCst);
                self.opens.fetch_add(1, Ordering::SeqCst);
                Ok(MemoryFile {
                    data: Cursor::new(Arc::clone(data)),
                    open_handles: Arc::clone(&self.open_handles),
                })
            }
            Some(Node::Dir { .. }) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.nodes().contains_key(path)
    }
}

/// Open file in a [`MemoryStorage`]; closing is dropping
#[derive(Debug)]
pub struct MemoryFile {
    data: Cursor<Arc<[u8]>>,
    open_handles: Arc<AtomicUsize>,
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}
