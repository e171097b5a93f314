// Empty directory pruning
// Runs after deletion and removes directories left with nothing but
// ignorable OS metadata files

use jwalk::WalkDir;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::error::{CleanError, ErrorContext};
use super::events::{CleanEvent, Reporter};
use super::filter::{default_empty_dir_filter, EmptyDirFilter};

/// Directories found empty and directories actually removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneResults {
    pub empty: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

/// Finds and removes empty directories below a root.
///
/// One call is a single pass: a parent that becomes empty because its last
/// child was removed stays until the next call.
#[derive(Clone)]
pub struct EmptyDirPruner {
    dry_run: bool,
    filter: EmptyDirFilter,
}

impl Default for EmptyDirPruner {
    fn default() -> Self {
        Self::new()
    }
}

impl EmptyDirPruner {
    pub fn new() -> Self {
        Self {
            dry_run: false,
            filter: default_empty_dir_filter(),
        }
    }

    /// Report empty directories as deleted without removing them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_filter(mut self, filter: EmptyDirFilter) -> Self {
        self.filter = filter;
        self
    }

    /// True when `dir` has no entries the filter accepts
    pub fn is_empty_dir(&self, dir: &Path) -> io::Result<bool> {
        for entry in fs::read_dir(dir)? {
            let name = entry?.file_name();
            if (self.filter)(&name.to_string_lossy()) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Find every empty subdirectory of `root` (the root itself excluded).
    pub fn find_empty(&self, root: &Path, reporter: Reporter<'_>) -> Result<Vec<PathBuf>, CleanError> {
        fs::read_dir(root).map_err(|e| CleanError::EmptyDir {
            path: root.to_path_buf(),
            source: e,
        })?;

        let mut empty = Vec::new();
        for entry_result in WalkDir::new(root).skip_hidden(false).follow_links(false) {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    reporter.record(
                        CleanError::EmptyDir {
                            path: path.clone(),
                            source: io::Error::new(io::ErrorKind::Other, e.to_string()),
                        },
                        "find_empty_dirs",
                        ErrorContext::Dir(path),
                    );
                    continue;
                }
            };

            if entry.depth == 0 || !entry.file_type().is_dir() {
                continue;
            }

            let dir = entry.path();
            match self.is_empty_dir(&dir) {
                Ok(true) => empty.push(dir),
                Ok(false) => {}
                Err(e) => {
                    reporter.record(
                        CleanError::EmptyDir {
                            path: dir.clone(),
                            source: e,
                        },
                        "find_empty_dirs",
                        ErrorContext::Dir(dir),
                    );
                }
            }
        }

        Ok(empty)
    }

    /// Find empty directories under `root` and remove them, deepest first.
    pub fn prune(&self, root: &Path, reporter: Reporter<'_>) -> Result<PruneResults, CleanError> {
        reporter.emit(CleanEvent::EmptyDirBegin);

        let empty = self.find_empty(root, reporter)?;
        tracing::info!(target: "modclean", empty = empty.len(), "empty directories found");
        reporter.emit(CleanEvent::EmptyDirList(empty.clone()));

        let deleted = if self.dry_run {
            for dir in &empty {
                reporter.emit(CleanEvent::EmptyDirDeleted(dir.clone()));
            }
            empty.clone()
        } else {
            self.remove_all(&empty, reporter)
        };

        reporter.emit(CleanEvent::EmptyDirDone(deleted.clone()));
        Ok(PruneResults { empty, deleted })
    }

    fn remove_all(&self, empty: &[PathBuf], reporter: Reporter<'_>) -> Vec<PathBuf> {
        let mut ordered: Vec<&PathBuf> = empty.iter().collect();
        ordered.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));

        let mut deleted = Vec::new();
        for dir in ordered {
            // Contents may have changed since discovery
            match self.is_empty_dir(dir) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    reporter.record(
                        CleanError::EmptyDir {
                            path: dir.clone(),
                            source: e,
                        },
                        "remove_empty_dirs",
                        ErrorContext::Dir(dir.clone()),
                    );
                    continue;
                }
            }

            match fs::remove_dir_all(dir) {
                Ok(()) => {
                    tracing::debug!(target: "modclean", dir = %dir.display(), "removed empty directory");
                    reporter.emit(CleanEvent::EmptyDirDeleted(dir.clone()));
                    deleted.push(dir.clone());
                }
                Err(e) => {
                    reporter.record(
                        CleanError::EmptyDir {
                            path: dir.clone(),
                            source: e,
                        },
                        "remove_empty_dirs",
                        ErrorContext::Dir(dir.clone()),
                    );
                }
            }
        }

        deleted
    }
}
