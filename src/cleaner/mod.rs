//! Cleaner module - removes unwanted files and directories from a modules folder
//!
//! Patterns from named pattern sources select candidates, a decision filter
//! approves them, approved candidates are deleted concurrently and directories
//! left empty are pruned afterwards. Progress is reported as [`CleanEvent`]s.

pub mod config;
pub mod deleter;
pub mod empty_dirs;
pub mod engine;
pub mod error;
pub mod events;
pub mod filter;
pub mod patterns;
pub mod scanner;

pub use config::{Options, SearchOverrides};
pub use deleter::{DeletionEngine, Outcome, ProcessResults};
pub use empty_dirs::{EmptyDirPruner, PruneResults};
pub use engine::{CleanResults, CleanStats, ModClean};
pub use error::{CleanError, ConfigError, ErrorContext, ErrorLog, ErrorRecord};
pub use events::{CleanEvent, EventEmitter, Reporter};
pub use filter::{AsyncFilter, Decision, DecisionFilter, EmptyDirFilter};
pub use patterns::{PatternRegistry, PatternSet, PatternSource, Rule};
pub use scanner::{Candidate, Scanner, SearchSettings};
