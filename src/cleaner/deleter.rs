//! Deletion of scanned candidates.
//!
//! Candidates are independent: each one runs through the decision filter and
//! is removed on its own task, with up to `concurrency` removals in flight.
//! A path that is already gone counts as deleted, so overlapping candidates
//! (a directory and something inside it) need no coordination.

use futures::stream::{self, StreamExt};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::{CleanError, ErrorContext};
use super::events::{CleanEvent, Reporter};
use super::filter::DecisionFilter;
use super::scanner::Candidate;

/// What happened to a single candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Deleted,
    Skipped,
    Failed,
}

/// Results of one deletion pass
#[derive(Debug, Clone, Default)]
pub struct ProcessResults {
    pub deleted: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    /// Per-candidate outcome in completion order
    pub outcomes: Vec<(PathBuf, Outcome)>,
    /// Sum of file sizes (from the discovery snapshot) of deleted non-directories
    pub bytes_freed: u64,
}

/// Applies the decision filter and removes approved candidates
#[derive(Clone)]
pub struct DeletionEngine {
    dry_run: bool,
    skip_modules: bool,
    error_halt: bool,
    concurrency: usize,
    filter: Option<Arc<dyn DecisionFilter>>,
}

impl Default for DeletionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DeletionEngine {
    pub fn new() -> Self {
        Self {
            dry_run: false,
            skip_modules: true,
            error_halt: false,
            concurrency: num_cpus::get().max(1) * 4,
            filter: None,
        }
    }

    /// Report approved candidates as deleted without touching the filesystem
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_skip_modules(mut self, skip_modules: bool) -> Self {
        self.skip_modules = skip_modules;
        self
    }

    /// Abort on the first removal failure instead of recording it
    pub fn with_error_halt(mut self, error_halt: bool) -> Self {
        self.error_halt = error_halt;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_filter(mut self, filter: Option<Arc<dyn DecisionFilter>>) -> Self {
        self.filter = filter;
        self
    }

    /// Run every candidate through the filter and delete the approved ones.
    ///
    /// Fails only when error-halt is enabled and a removal fails for a reason
    /// other than the path being gone; remaining candidates are abandoned.
    pub async fn process(
        &self,
        candidates: &[Candidate],
        reporter: Reporter<'_>,
    ) -> Result<ProcessResults, CleanError> {
        let mut results = ProcessResults::default();

        reporter.emit(CleanEvent::DeleteBegin(candidates.to_vec()));
        tracing::info!(
            target: "modclean",
            candidates = candidates.len(),
            dry_run = self.dry_run,
            "processing candidates"
        );

        let mut pending = stream::iter(candidates.iter().map(|candidate| async move {
            let outcome = self.handle(candidate, reporter).await;
            (candidate, outcome)
        }))
        .buffer_unordered(self.concurrency);

        while let Some((candidate, outcome)) = pending.next().await {
            let outcome = outcome?;
            let path = candidate.full_path.clone();
            match outcome {
                Outcome::Deleted => {
                    if !candidate.is_dir {
                        results.bytes_freed += candidate.metadata.len();
                    }
                    results.deleted.push(path.clone());
                }
                Outcome::Skipped => results.skipped.push(path.clone()),
                Outcome::Failed => results.failed.push(path.clone()),
            }
            results.outcomes.push((path, outcome));
        }

        tracing::info!(
            target: "modclean",
            deleted = results.deleted.len(),
            skipped = results.skipped.len(),
            failed = results.failed.len(),
            "deletion done"
        );
        reporter.emit(CleanEvent::DeleteDone(results.deleted.clone()));
        Ok(results)
    }

    async fn handle(&self, candidate: &Candidate, reporter: Reporter<'_>) -> Result<Outcome, CleanError> {
        let mut approved = match &self.filter {
            Some(filter) => filter.decide(candidate).resolve().await,
            None => true,
        };

        if self.skip_modules && candidate.is_module {
            approved = false;
        }

        if !approved {
            tracing::debug!(target: "modclean", path = %candidate.full_path.display(), "skipped");
            reporter.emit(CleanEvent::CandidateSkipped(candidate.clone()));
            return Ok(Outcome::Skipped);
        }

        if self.dry_run {
            reporter.emit(CleanEvent::CandidateDeleted(candidate.clone()));
            return Ok(Outcome::Deleted);
        }

        match remove_candidate(candidate).await {
            Ok(()) => {
                tracing::debug!(target: "modclean", path = %candidate.full_path.display(), "deleted");
                reporter.emit(CleanEvent::CandidateDeleted(candidate.clone()));
                Ok(Outcome::Deleted)
            }
            Err(e) => {
                let halt_copy = io::Error::new(e.kind(), e.to_string());
                reporter.record(
                    CleanError::Deletion {
                        path: candidate.full_path.clone(),
                        source: e,
                    },
                    "delete",
                    ErrorContext::Candidate(candidate.full_path.clone()),
                );

                if self.error_halt {
                    return Err(CleanError::Deletion {
                        path: candidate.full_path.clone(),
                        source: halt_copy,
                    });
                }
                Ok(Outcome::Failed)
            }
        }
    }
}

/// Remove a candidate recursively; a missing path counts as removed.
async fn remove_candidate(candidate: &Candidate) -> io::Result<()> {
    let result = if candidate.is_dir {
        tokio::fs::remove_dir_all(&candidate.full_path).await
    } else {
        tokio::fs::remove_file(&candidate.full_path).await
    };

    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
