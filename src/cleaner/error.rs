// Error handling for the cleaner
// Fatal errors abort a run; per-item errors are recorded and the run continues

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Configuration problems, always surfaced before the filesystem is touched
#[derive(Debug)]
pub enum ConfigError {
    /// A selector named a pattern source that is neither bundled nor a readable file
    PatternSourceNotFound { source: String },
    /// A selector named a rule the source does not define
    UnknownRule { source: String, rule: String },
    /// The pattern source exists but could not be used
    InvalidPatternSource { source: String, reason: String },
    /// A glob failed to compile
    InvalidGlob { pattern: String, reason: String },
    /// Resolution produced an empty allow set
    NoPatterns,
    /// The options file could not be read or parsed
    InvalidOptions { path: Option<PathBuf>, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::PatternSourceNotFound { source } => {
                write!(f, "Unable to find pattern source \"{}\", is it installed?", source)
            }
            ConfigError::UnknownRule { source, rule } => {
                write!(f, "Pattern source \"{}\" does not contain rule \"{}\"", source, rule)
            }
            ConfigError::InvalidPatternSource { source, reason } => {
                write!(f, "Invalid pattern source \"{}\": {}", source, reason)
            }
            ConfigError::InvalidGlob { pattern, reason } => {
                write!(f, "Invalid glob pattern \"{}\": {}", pattern, reason)
            }
            ConfigError::NoPatterns => {
                write!(f, "No patterns have been loaded, nothing to check against")
            }
            ConfigError::InvalidOptions { path, reason } => match path {
                Some(p) => write!(f, "Invalid options file {}: {}", p.display(), reason),
                None => write!(f, "Invalid options: {}", reason),
            },
        }
    }
}

impl std::error::Error for ConfigError {}

/// Main error type for clean runs
#[derive(Debug)]
pub enum CleanError {
    /// Bad or missing pattern configuration
    Config(ConfigError),
    /// The filesystem walk could not run at all
    Search { root: PathBuf, source: io::Error },
    /// A candidate could not be stat'ed or listed
    Stat { path: PathBuf, source: io::Error },
    /// A candidate could not be removed
    Deletion { path: PathBuf, source: io::Error },
    /// An empty directory could not be inspected or removed
    EmptyDir { path: PathBuf, source: io::Error },
}

impl fmt::Display for CleanError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CleanError::Config(e) => write!(f, "Configuration error: {}", e),
            CleanError::Search { root, source } => {
                write!(f, "Failed to search {}: {}", root.display(), source)
            }
            CleanError::Stat { path, source } => {
                write!(f, "Failed to stat {}: {}", path.display(), source)
            }
            CleanError::Deletion { path, source } => {
                write!(f, "Failed to delete {}: {}", path.display(), source)
            }
            CleanError::EmptyDir { path, source } => {
                write!(f, "Failed to clean empty directory {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for CleanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CleanError::Config(e) => Some(e),
            CleanError::Search { source, .. }
            | CleanError::Stat { source, .. }
            | CleanError::Deletion { source, .. }
            | CleanError::EmptyDir { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for CleanError {
    fn from(err: ConfigError) -> Self {
        CleanError::Config(err)
    }
}

impl CleanError {
    /// True when the underlying I/O error says the path is already gone
    pub fn is_not_found(&self) -> bool {
        match self {
            CleanError::Search { source, .. }
            | CleanError::Stat { source, .. }
            | CleanError::Deletion { source, .. }
            | CleanError::EmptyDir { source, .. } => source.kind() == io::ErrorKind::NotFound,
            CleanError::Config(_) => false,
        }
    }

    /// True for errors that abort a run before anything is deleted
    pub fn is_config(&self) -> bool {
        matches!(self, CleanError::Config(_))
    }
}

/// What an error record refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorContext {
    None,
    Candidate(PathBuf),
    Dir(PathBuf),
}

/// A recorded, non-fatal error
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub error: Arc<CleanError>,
    /// Name of the operation that produced the error
    pub method: &'static str,
    pub context: ErrorContext,
}

impl ErrorRecord {
    pub fn new(error: CleanError, method: &'static str, context: ErrorContext) -> Self {
        Self {
            error: Arc::new(error),
            method,
            context,
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {}", self.method, self.error)
    }
}

/// Per-run error accumulator
#[derive(Debug, Default)]
pub struct ErrorLog {
    records: Mutex<Vec<ErrorRecord>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: ErrorRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of everything recorded so far
    pub fn snapshot(&self) -> Vec<ErrorRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
