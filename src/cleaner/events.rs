//! Lifecycle notifications emitted during a clean run.
//!
//! The cleaner never prints anything itself. Presentation layers register a
//! listener on [`EventEmitter`] and render whatever they need.

use std::path::PathBuf;
use std::sync::Arc;

use super::engine::CleanResults;
use super::error::{CleanError, ErrorContext, ErrorLog, ErrorRecord};
use super::scanner::{Candidate, SearchSettings};

/// A single lifecycle notification.
#[derive(Debug)]
pub enum CleanEvent {
    /// The run started with this effective root and search configuration.
    CleanStart {
        root: PathBuf,
        settings: SearchSettings,
        dry_run: bool,
    },
    /// Patterns were resolved and the walk is about to begin.
    PatternSearchBegin {
        allow: Vec<String>,
        ignore: Vec<String>,
        settings: SearchSettings,
    },
    /// The walk finished; every surviving candidate.
    CandidatesReady(Vec<Candidate>),
    /// Deletion is about to process these candidates.
    DeleteBegin(Vec<Candidate>),
    CandidateSkipped(Candidate),
    CandidateDeleted(Candidate),
    /// Deletion pass finished; paths that were removed.
    DeleteDone(Vec<PathBuf>),
    EmptyDirBegin,
    /// Directories found empty.
    EmptyDirList(Vec<PathBuf>),
    EmptyDirDeleted(PathBuf),
    /// Empty-dir pass finished; directories that were removed.
    EmptyDirDone(Vec<PathBuf>),
    /// A non-fatal error was recorded.
    Error(ErrorRecord),
    CleanComplete(CleanResults),
}

impl CleanEvent {
    /// Stable event name
    pub fn name(&self) -> &'static str {
        match self {
            CleanEvent::CleanStart { .. } => "clean:start",
            CleanEvent::PatternSearchBegin { .. } => "pattern-search:begin",
            CleanEvent::CandidatesReady(_) => "candidates:ready",
            CleanEvent::DeleteBegin(_) => "delete:begin",
            CleanEvent::CandidateSkipped(_) => "candidate:skipped",
            CleanEvent::CandidateDeleted(_) => "candidate:deleted",
            CleanEvent::DeleteDone(_) => "delete:done",
            CleanEvent::EmptyDirBegin => "emptydir:begin",
            CleanEvent::EmptyDirList(_) => "emptydir:list",
            CleanEvent::EmptyDirDeleted(_) => "emptydir:deleted",
            CleanEvent::EmptyDirDone(_) => "emptydir:done",
            CleanEvent::Error(_) => "error",
            CleanEvent::CleanComplete(_) => "clean:complete",
        }
    }
}

/// Type alias for event listener callbacks
pub type Listener = Arc<dyn Fn(&CleanEvent) + Send + Sync>;

/// Fan-out of events to registered listeners
#[derive(Clone, Default)]
pub struct EventEmitter {
    listeners: Vec<Listener>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it sees every event of every subsequent run.
    pub fn on<F>(&mut self, listener: F)
    where
        F: Fn(&CleanEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    pub fn emit(&self, event: CleanEvent) {
        tracing::trace!(target: "modclean", event = event.name(), "emit");
        for listener in &self.listeners {
            listener(&event);
        }
    }

    pub fn has_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Emitter plus error log of a single run
#[derive(Clone, Copy)]
pub struct Reporter<'a> {
    emitter: &'a EventEmitter,
    errors: &'a ErrorLog,
}

impl<'a> Reporter<'a> {
    pub fn new(emitter: &'a EventEmitter, errors: &'a ErrorLog) -> Self {
        Self { emitter, errors }
    }

    pub fn emit(&self, event: CleanEvent) {
        self.emitter.emit(event);
    }

    /// Store the error in the run's log and announce it.
    pub fn record(&self, error: CleanError, method: &'static str, context: ErrorContext) -> ErrorRecord {
        tracing::warn!(target: "modclean", method, "{}", error);
        let record = ErrorRecord::new(error, method, context);
        self.errors.push(record.clone());
        self.emitter.emit(CleanEvent::Error(record.clone()));
        record
    }

    pub fn errors(&self) -> &'a ErrorLog {
        self.errors
    }
}
