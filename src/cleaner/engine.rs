//! The clean pipeline: resolve patterns, find candidates, delete them, then
//! prune directories left empty.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::Options;
use super::deleter::{DeletionEngine, ProcessResults};
use super::empty_dirs::{EmptyDirPruner, PruneResults};
use super::error::{CleanError, ErrorLog, ErrorRecord};
use super::events::{CleanEvent, EventEmitter, Reporter};
use super::patterns::{PatternRegistry, PatternSet};
use super::scanner::{Candidate, Scanner};

/// Everything a run produced
#[derive(Debug, Clone, Default)]
pub struct CleanResults {
    /// Every candidate found
    pub files: Vec<Candidate>,
    pub deleted: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    /// Directories found empty after deletion
    pub empty: Vec<PathBuf>,
    /// Empty directories removed
    pub empty_deleted: Vec<PathBuf>,
    pub errors: Vec<ErrorRecord>,
    pub bytes_freed: u64,
    pub elapsed: Duration,
}

/// Summary counts for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanStats {
    pub files_found: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub empty_found: usize,
    pub empty_deleted: usize,
    pub errors: usize,
    pub bytes_freed: u64,
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

// Serialize Duration as seconds
fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

impl CleanResults {
    pub fn stats(&self) -> CleanStats {
        CleanStats {
            files_found: self.files.len(),
            deleted: self.deleted.len(),
            skipped: self.skipped.len(),
            failed: self.failed.len(),
            empty_found: self.empty.len(),
            empty_deleted: self.empty_deleted.len(),
            errors: self.errors.len(),
            bytes_freed: self.bytes_freed,
            elapsed: self.elapsed,
        }
    }
}

/// Cleans a modules directory according to [`Options`].
///
/// Patterns are resolved on construction, so configuration errors surface
/// before anything on disk is touched. Each call to [`ModClean::clean`] is an
/// independent run with its own results and error log.
#[derive(Debug)]
pub struct ModClean {
    options: Options,
    patterns: PatternSet,
    root: PathBuf,
    emitter: EventEmitter,
}

impl ModClean {
    pub fn new(options: Options) -> Result<Self, CleanError> {
        Self::with_registry(options, &PatternRegistry::new())
    }

    /// Like [`ModClean::new`], resolving selectors against a custom registry
    pub fn with_registry(options: Options, registry: &PatternRegistry) -> Result<Self, CleanError> {
        let patterns = registry.resolve(
            &options.patterns,
            &options.additional_patterns,
            &options.ignore_patterns,
        )?;
        let root = options.root();

        Ok(Self {
            options,
            patterns,
            root,
            emitter: EventEmitter::new(),
        })
    }

    /// Register an event listener
    pub fn on<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(&CleanEvent) + Send + Sync + 'static,
    {
        self.emitter.on(listener);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Directory being cleaned
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run the full pipeline.
    pub async fn clean(&self) -> Result<CleanResults, CleanError> {
        let started = Instant::now();
        let errors = Arc::new(ErrorLog::new());

        tracing::info!(target: "modclean", root = %self.root.display(), test = self.options.test, "clean start");
        self.emitter.emit(CleanEvent::CleanStart {
            root: self.root.clone(),
            settings: self.options.search_settings(),
            dry_run: self.options.test,
        });

        let files = self.find_with(&errors).await?;
        let processed = self.process_with(&files, &errors).await?;
        let pruned = if self.options.remove_empty_dirs {
            self.prune_with(&errors).await?
        } else {
            PruneResults::default()
        };

        let results = CleanResults {
            files,
            deleted: processed.deleted,
            skipped: processed.skipped,
            failed: processed.failed,
            empty: pruned.empty,
            empty_deleted: pruned.deleted,
            errors: errors.snapshot(),
            bytes_freed: processed.bytes_freed,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            target: "modclean",
            deleted = results.deleted.len(),
            empty_deleted = results.empty_deleted.len(),
            errors = results.errors.len(),
            "clean complete"
        );
        self.emitter.emit(CleanEvent::CleanComplete(results.clone()));
        Ok(results)
    }

    /// Find candidates without deleting anything
    pub async fn find(&self) -> Result<Vec<Candidate>, CleanError> {
        self.find_with(&Arc::new(ErrorLog::new())).await
    }

    /// Run the deletion pass over previously found candidates
    pub async fn process(&self, candidates: &[Candidate]) -> Result<ProcessResults, CleanError> {
        self.process_with(candidates, &ErrorLog::new()).await
    }

    /// Run only the empty-directory pass. Returns `None` when disabled.
    pub async fn clean_empty_dirs(&self) -> Result<Option<PruneResults>, CleanError> {
        if !self.options.remove_empty_dirs {
            return Ok(None);
        }
        self.prune_with(&Arc::new(ErrorLog::new())).await.map(Some)
    }

    fn scanner(&self) -> Scanner {
        Scanner::new(&self.root)
            .with_settings(self.options.search_settings())
            .with_modules_dir(self.options.modules_dir().map(str::to_string))
            .with_manifest_file(self.options.manifest_file.clone())
    }

    fn deletion_engine(&self) -> DeletionEngine {
        DeletionEngine::new()
            .with_dry_run(self.options.test)
            .with_skip_modules(self.options.skip_modules)
            .with_error_halt(self.options.error_halt)
            .with_concurrency(self.options.concurrency)
            .with_filter(self.options.filter.clone())
    }

    fn pruner(&self) -> EmptyDirPruner {
        EmptyDirPruner::new()
            .with_dry_run(self.options.test)
            .with_filter(Arc::clone(&self.options.empty_dir_filter))
    }

    async fn find_with(&self, errors: &Arc<ErrorLog>) -> Result<Vec<Candidate>, CleanError> {
        let scanner = self.scanner();
        let patterns = self.patterns.clone();
        let emitter = self.emitter.clone();
        let errors = Arc::clone(errors);

        tokio::task::spawn_blocking(move || scanner.find(&patterns, Reporter::new(&emitter, &errors)))
            .await
            .map_err(|e| CleanError::Search {
                root: self.root.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })?
    }

    async fn process_with(&self, candidates: &[Candidate], errors: &ErrorLog) -> Result<ProcessResults, CleanError> {
        self.deletion_engine()
            .process(candidates, Reporter::new(&self.emitter, errors))
            .await
    }

    async fn prune_with(&self, errors: &Arc<ErrorLog>) -> Result<PruneResults, CleanError> {
        let pruner = self.pruner();
        let root = self.root.clone();
        let emitter = self.emitter.clone();
        let errors = Arc::clone(errors);

        tokio::task::spawn_blocking(move || pruner.prune(&root, Reporter::new(&emitter, &errors)))
            .await
            .map_err(|e| CleanError::EmptyDir {
                path: self.root.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })?
    }
}
