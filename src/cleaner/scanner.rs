// Candidate discovery
// Walks the root once with jwalk, matches entries against the allow globs,
// then stats and classifies every match in parallel

use globset::GlobSet;
use jwalk::WalkDir;
use rayon::prelude::*;
use serde::Serialize;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::{CleanError, ErrorContext};
use super::events::{CleanEvent, Reporter};
use super::patterns::{compile_allow, compile_ignore, GlobOptions, PatternSet};

/// Effective search settings after overrides are applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSettings {
    pub ignore_case: bool,
    pub dot_files: bool,
    pub no_dirs: bool,
    pub follow_symlink: bool,
    pub literal_separator: bool,
    pub max_depth: Option<usize>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            ignore_case: true,
            dot_files: true,
            no_dirs: false,
            follow_symlink: false,
            literal_separator: true,
            max_depth: None,
        }
    }
}

impl SearchSettings {
    fn glob_options(&self) -> GlobOptions {
        GlobOptions {
            case_insensitive: self.ignore_case,
            literal_separator: self.literal_separator,
        }
    }
}

/// A filesystem entry matched for possible deletion
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Path relative to the scan root
    pub path: PathBuf,
    pub full_path: PathBuf,
    /// Absolute path of the parent directory
    pub dir: PathBuf,
    pub name: String,
    pub is_dir: bool,
    /// Directory directly under the modules directory holding a manifest
    pub is_module: bool,
    /// Snapshot taken at discovery time
    pub metadata: Metadata,
}

/// Finds deletion candidates under a root directory
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    settings: SearchSettings,
    modules_dir: Option<String>,
    manifest_file: String,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            settings: SearchSettings::default(),
            modules_dir: Some("node_modules".to_string()),
            manifest_file: "package.json".to_string(),
        }
    }

    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Name of the directory whose children may be module roots; `None` disables detection
    pub fn with_modules_dir(mut self, modules_dir: Option<String>) -> Self {
        self.modules_dir = modules_dir;
        self
    }

    pub fn with_manifest_file(mut self, manifest_file: impl Into<String>) -> Self {
        self.manifest_file = manifest_file.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Walk the root and return every candidate matched by `patterns.allow`.
    ///
    /// Only a walk that cannot start is fatal. Entries that fail to stat or
    /// list are recorded through `reporter` and dropped.
    pub fn find(&self, patterns: &PatternSet, reporter: Reporter<'_>) -> Result<Vec<Candidate>, CleanError> {
        let opts = self.settings.glob_options();
        let allow = compile_allow(&patterns.allow, opts)?;
        let ignore = compile_ignore(&patterns.ignore, opts)?;

        let root_meta = fs::metadata(&self.root).map_err(|e| CleanError::Search {
            root: self.root.clone(),
            source: e,
        })?;
        if !root_meta.is_dir() {
            return Err(CleanError::Search {
                root: self.root.clone(),
                source: io::Error::new(io::ErrorKind::Other, "not a directory"),
            });
        }

        reporter.emit(CleanEvent::PatternSearchBegin {
            allow: patterns.allow.clone(),
            ignore: patterns.ignore.clone(),
            settings: self.settings.clone(),
        });
        tracing::debug!(target: "modclean", root = %self.root.display(), "searching");

        let matches = self.walk(&allow, &ignore, reporter);

        let built: Vec<Result<Candidate, CleanError>> = matches
            .par_iter()
            .map(|rel| self.build_candidate(rel))
            .collect();

        let mut candidates = Vec::with_capacity(built.len());
        for result in built {
            match result {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => {
                    let path = match &e {
                        CleanError::Stat { path, .. } => path.clone(),
                        _ => self.root.clone(),
                    };
                    reporter.record(e, "find", ErrorContext::Candidate(path));
                }
            }
        }

        tracing::info!(target: "modclean", found = candidates.len(), "candidates ready");
        reporter.emit(CleanEvent::CandidatesReady(candidates.clone()));
        Ok(candidates)
    }

    /// Relative paths of all entries matched by `allow` and not excluded.
    ///
    /// Ignored and (when dot files are off) hidden entries are dropped while
    /// reading each directory, so their subtrees are never descended into.
    fn walk(&self, allow: &GlobSet, ignore: &GlobSet, reporter: Reporter<'_>) -> Vec<PathBuf> {
        let root = self.root.clone();
        let ignore = Arc::new(ignore.clone());
        let dot_files = self.settings.dot_files;

        let mut walker = WalkDir::new(&self.root)
            .skip_hidden(false)
            .follow_links(self.settings.follow_symlink)
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|child| match child {
                    Ok(entry) => {
                        let full = entry.path();
                        let rel = full.strip_prefix(&root).unwrap_or(&full);
                        if !dot_files && entry.file_name.to_string_lossy().starts_with('.') {
                            return false;
                        }
                        ignore.is_empty() || !ignore.is_match(rel)
                    }
                    Err(_) => true,
                });
            });
        if let Some(depth) = self.settings.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut matches = Vec::new();
        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                    reporter.record(
                        CleanError::Stat {
                            path: path.clone(),
                            source: io::Error::new(io::ErrorKind::Other, e.to_string()),
                        },
                        "find",
                        ErrorContext::Candidate(path),
                    );
                    continue;
                }
            };

            let full = entry.path();
            let rel = match full.strip_prefix(&self.root) {
                Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
                _ => continue,
            };

            if self.settings.no_dirs && entry.file_type().is_dir() {
                continue;
            }
            if allow.is_match(&rel) {
                matches.push(rel);
            }
        }

        matches
    }

    fn build_candidate(&self, rel: &Path) -> Result<Candidate, CleanError> {
        let full_path = self.root.join(rel);
        let stat_error = |e: io::Error| CleanError::Stat {
            path: full_path.clone(),
            source: e,
        };

        let metadata = if self.settings.follow_symlink {
            fs::metadata(&full_path)
        } else {
            fs::symlink_metadata(&full_path)
        }
        .map_err(stat_error)?;

        let is_dir = metadata.is_dir();
        let is_module = if is_dir {
            self.is_module_root(&full_path).map_err(stat_error)?
        } else {
            false
        };

        let dir = full_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        let name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Candidate {
            path: rel.to_path_buf(),
            full_path,
            dir,
            name,
            is_dir,
            is_module,
            metadata,
        })
    }

    /// A directory is a module root when its parent is named like the modules
    /// directory and it directly contains the manifest file.
    fn is_module_root(&self, dir: &Path) -> io::Result<bool> {
        let mut has_manifest = false;
        for entry in fs::read_dir(dir)? {
            if entry?.file_name().to_string_lossy() == self.manifest_file.as_str() {
                has_manifest = true;
            }
        }

        let parent_matches = match (&self.modules_dir, dir.parent().and_then(Path::file_name)) {
            (Some(modules_dir), Some(parent)) => parent.to_string_lossy() == modules_dir.as_str(),
            _ => false,
        };

        Ok(has_manifest && parent_matches)
    }
}
