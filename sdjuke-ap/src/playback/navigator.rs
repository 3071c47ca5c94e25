//! Track navigator
//!
//! Finds the next or previous playable file relative to the current one by
//! walking the volume depth-first in its native listing order. Nothing is
//! cached between calls: every query re-walks the tree, so the result always
//! reflects what is on the card right now.

use crate::storage::{EntryKind, Storage};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default accepted file extension
pub const DEFAULT_EXTENSION: &str = "mp3";

/// Joined paths this long (in bytes) or longer are skipped
pub const DEFAULT_MAX_PATH_LEN: usize = 300;

/// Navigation direction; persists across player loop iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// One navigation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigatorQuery {
    /// Track last played; `None` means no current track
    pub current: Option<PathBuf>,
    pub direction: Direction,
}

impl NavigatorQuery {
    pub fn new(current: Option<PathBuf>, direction: Direction) -> Self {
        Self { current, direction }
    }
}

/// Navigation outcome; `found` is `None` when nothing qualifies
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigatorResult {
    pub found: Option<PathBuf>,
}

/// Stateless walker over one root folder
#[derive(Debug, Clone)]
pub struct TrackNavigator {
    root: PathBuf,
    extension: String,
    max_path_len: usize,
}

impl TrackNavigator {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>, max_path_len: usize) -> Self {
        let extension: String = extension.into();
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
            max_path_len,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Answer one navigation query against the current storage contents.
    ///
    /// Forward from no current track yields the first eligible file;
    /// otherwise the first eligible file after the current one. Backward
    /// yields the eligible file seen just before the current one. A current
    /// path that is not in the tree yields nothing in either direction.
    pub fn find<S: Storage>(&self, storage: &S, query: &NavigatorQuery) -> NavigatorResult {
        let found = match query.direction {
            Direction::Forward => self.find_forward(storage, query.current.as_deref()),
            Direction::Backward => match query.current.as_deref() {
                Some(current) => self.find_backward(storage, current),
                None => {
                    debug!("Backward navigation without a current track");
                    None
                }
            },
        };

        debug!(
            current = ?query.current,
            direction = ?query.direction,
            found = ?found,
            "Navigation query"
        );
        NavigatorResult { found }
    }

    fn find_forward<S: Storage>(&self, storage: &S, current: Option<&Path>) -> Option<PathBuf> {
        let mut passed_current = current.is_none();
        let mut found = None;

        let _ = self.walk(storage, |path| {
            if passed_current {
                found = Some(path.to_path_buf());
                return ControlFlow::Break(());
            }
            if Some(path) == current {
                passed_current = true;
            }
            ControlFlow::Continue(())
        });

        found
    }

    fn find_backward<S: Storage>(&self, storage: &S, current: &Path) -> Option<PathBuf> {
        let mut last_seen: Option<PathBuf> = None;
        let mut found = None;

        let _ = self.walk(storage, |path| {
            if path == current {
                found = last_seen.take();
                return ControlFlow::Break(());
            }
            last_seen = Some(path.to_path_buf());
            ControlFlow::Continue(())
        });

        found
    }

    /// Eligible by name: text after the last '.' matches the extension
    fn is_eligible(&self, name: &str) -> bool {
        name.rsplit_once('.')
            .map(|(_, ext)| ext.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }

    /// Visit every eligible file depth-first, stopping at the first `Break`.
    ///
    /// Uses an explicit stack of directory listings instead of recursion;
    /// each frame holds the directory path and its remaining entries.
    pub fn walk<S, F>(&self, storage: &S, mut visit: F) -> ControlFlow<()>
    where
        S: Storage,
        F: FnMut(&Path) -> ControlFlow<()>,
    {
        let mut stack = Vec::new();
        match storage.read_dir(&self.root) {
            Ok(entries) => stack.push((self.root.clone(), entries.into_iter())),
            Err(e) => {
                warn!("Failed to open dir {}: {}", self.root.display(), e);
                return ControlFlow::Continue(());
            }
        }

        while let Some((dir, entries)) = stack.last_mut() {
            let Some(entry) = entries.next() else {
                stack.pop();
                continue;
            };
            if entry.name == "." || entry.name == ".." {
                continue;
            }

            let path = dir.join(&entry.name);
            if path.as_os_str().len() >= self.max_path_len {
                warn!("Path too long, skipping: {}", entry.name);
                continue;
            }

            match entry.kind {
                EntryKind::Directory => match storage.read_dir(&path) {
                    Ok(children) => stack.push((path, children.into_iter())),
                    Err(e) => warn!("Failed to open dir {}: {}", path.display(), e),
                },
                EntryKind::File if self.is_eligible(&entry.name) => visit(path.as_path())?,
                _ => {}
            }
        }

        ControlFlow::Continue(())
    }
}
