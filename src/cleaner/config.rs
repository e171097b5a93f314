//! Options for a clean run.
//!
//! Everything except the callbacks can also be loaded from a TOML file:
//!
//! ```toml
//! cwd = "./my-project"
//! patterns = ["default:safe,caution"]
//! ignore_patterns = ["**/keep-me/**"]
//! test = true
//!
//! [search]
//! max_depth = 8
//! ```

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::ConfigError;
use super::filter::{default_empty_dir_filter, DecisionFilter, EmptyDirFilter};
use super::scanner::SearchSettings;

/// Low-level search overrides; each set value wins over the top-level option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchOverrides {
    pub max_depth: Option<usize>,
    pub literal_separator: Option<bool>,
    pub ignore_case: Option<bool>,
    pub dot_files: Option<bool>,
    pub follow_symlink: Option<bool>,
    pub no_dirs: Option<bool>,
}

/// Configuration of a clean run
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Directory to clean
    pub cwd: PathBuf,
    /// Appended to `cwd` unless `cwd` already ends with it; `None` or an empty
    /// name disables both the adjustment and module detection
    pub modules_dir: Option<String>,
    /// File whose presence marks a module root
    pub manifest_file: String,
    /// Pattern selectors, `source[:rule[,rule...]]`
    pub patterns: Vec<String>,
    pub additional_patterns: Vec<String>,
    pub ignore_patterns: Vec<String>,
    /// Never delete directories
    pub no_dirs: bool,
    pub ignore_case: bool,
    pub dot_files: bool,
    pub follow_symlink: bool,
    /// Never delete module roots, whatever the filter says
    pub skip_modules: bool,
    pub remove_empty_dirs: bool,
    /// Stop at the first deletion failure
    pub error_halt: bool,
    /// Dry run: report what would be deleted without deleting
    pub test: bool,
    /// Maximum number of deletions in flight
    pub concurrency: usize,
    pub search: SearchOverrides,
    #[serde(skip)]
    pub filter: Option<Arc<dyn DecisionFilter>>,
    #[serde(skip, default = "default_empty_dir_filter")]
    pub empty_dir_filter: EmptyDirFilter,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            modules_dir: Some("node_modules".to_string()),
            manifest_file: "package.json".to_string(),
            patterns: vec!["default:safe".to_string()],
            additional_patterns: Vec::new(),
            ignore_patterns: Vec::new(),
            no_dirs: false,
            ignore_case: true,
            dot_files: true,
            follow_symlink: false,
            skip_modules: true,
            remove_empty_dirs: true,
            error_halt: false,
            test: false,
            concurrency: num_cpus::get().max(1) * 4,
            search: SearchOverrides::default(),
            filter: None,
            empty_dir_filter: default_empty_dir_filter(),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("cwd", &self.cwd)
            .field("modules_dir", &self.modules_dir)
            .field("manifest_file", &self.manifest_file)
            .field("patterns", &self.patterns)
            .field("additional_patterns", &self.additional_patterns)
            .field("ignore_patterns", &self.ignore_patterns)
            .field("no_dirs", &self.no_dirs)
            .field("ignore_case", &self.ignore_case)
            .field("dot_files", &self.dot_files)
            .field("follow_symlink", &self.follow_symlink)
            .field("skip_modules", &self.skip_modules)
            .field("remove_empty_dirs", &self.remove_empty_dirs)
            .field("error_halt", &self.error_halt)
            .field("test", &self.test)
            .field("concurrency", &self.concurrency)
            .field("search", &self.search)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from TOML; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidOptions {
            path: None,
            reason: e.to_string(),
        })
    }

    /// Load options from a TOML file. A relative `cwd` is resolved against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::InvalidOptions {
            path: Some(path.to_path_buf()),
            reason: e.to_string(),
        })?;

        let mut options: Options = toml::from_str(&content).map_err(|e| ConfigError::InvalidOptions {
            path: Some(path.to_path_buf()),
            reason: e.to_string(),
        })?;

        if options.cwd.is_relative() {
            if let Some(base) = path.parent() {
                options.cwd = base.join(&options.cwd);
            }
        }

        Ok(options)
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_modules_dir(mut self, modules_dir: Option<String>) -> Self {
        self.modules_dir = modules_dir;
        self
    }

    pub fn with_patterns<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_additional_patterns<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.additional_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ignore_patterns<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.ignore_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_test(mut self, test: bool) -> Self {
        self.test = test;
        self
    }

    pub fn with_error_halt(mut self, error_halt: bool) -> Self {
        self.error_halt = error_halt;
        self
    }

    pub fn with_skip_modules(mut self, skip_modules: bool) -> Self {
        self.skip_modules = skip_modules;
        self
    }

    pub fn with_remove_empty_dirs(mut self, remove_empty_dirs: bool) -> Self {
        self.remove_empty_dirs = remove_empty_dirs;
        self
    }

    pub fn with_no_dirs(mut self, no_dirs: bool) -> Self {
        self.no_dirs = no_dirs;
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_dot_files(mut self, dot_files: bool) -> Self {
        self.dot_files = dot_files;
        self
    }

    pub fn with_follow_symlink(mut self, follow_symlink: bool) -> Self {
        self.follow_symlink = follow_symlink;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_filter<F: DecisionFilter + 'static>(mut self, filter: F) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_empty_dir_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.empty_dir_filter = Arc::new(filter);
        self
    }

    /// Modules directory name, if enabled
    pub fn modules_dir(&self) -> Option<&str> {
        self.modules_dir.as_deref().filter(|name| !name.is_empty())
    }

    /// Directory actually cleaned: `cwd`, or `cwd/<modules_dir>` when `cwd`
    /// is not already the modules directory.
    pub fn root(&self) -> PathBuf {
        match self.modules_dir() {
            Some(name) if self.cwd.file_name().map(|n| n != name).unwrap_or(true) => {
                self.cwd.join(name)
            }
            _ => self.cwd.clone(),
        }
    }

    /// Search settings with overrides applied
    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            ignore_case: self.search.ignore_case.unwrap_or(self.ignore_case),
            dot_files: self.search.dot_files.unwrap_or(self.dot_files),
            no_dirs: self.search.no_dirs.unwrap_or(self.no_dirs),
            follow_symlink: self.search.follow_symlink.unwrap_or(self.follow_symlink),
            literal_separator: self.search.literal_separator.unwrap_or(true),
            max_depth: self.search.max_depth,
        }
    }
}
