//! Caller-supplied callbacks: the per-candidate decision filter and the
//! empty-directory content filter.

use futures::future::BoxFuture;
use std::sync::Arc;

use super::scanner::Candidate;

/// Outcome of a decision filter, either known now or resolved later.
pub enum Decision {
    /// Immediate answer; `true` deletes, `false` skips.
    Ready(bool),
    /// Answer produced asynchronously.
    Pending(BoxFuture<'static, bool>),
}

impl Decision {
    /// Resolve the decision, awaiting it if necessary.
    pub async fn resolve(self) -> bool {
        match self {
            Decision::Ready(value) => value,
            Decision::Pending(fut) => fut.await,
        }
    }
}

impl From<bool> for Decision {
    fn from(value: bool) -> Self {
        Decision::Ready(value)
    }
}

/// Decides whether a candidate should be deleted.
///
/// Called concurrently from several candidates, so implementations must not
/// hold mutable state across calls.
pub trait DecisionFilter: Send + Sync {
    fn decide(&self, candidate: &Candidate) -> Decision;
}

impl<F> DecisionFilter for F
where
    F: Fn(&Candidate) -> bool + Send + Sync,
{
    fn decide(&self, candidate: &Candidate) -> Decision {
        Decision::Ready(self(candidate))
    }
}

/// Wraps an async closure as a decision filter.
pub struct AsyncFilter<F>(pub F);

impl<F> DecisionFilter for AsyncFilter<F>
where
    F: Fn(&Candidate) -> BoxFuture<'static, bool> + Send + Sync,
{
    fn decide(&self, candidate: &Candidate) -> Decision {
        Decision::Pending((self.0)(candidate))
    }
}

/// Predicate over directory entry names; `false` means the entry does not
/// count toward a directory being non-empty.
pub type EmptyDirFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// OS metadata artifacts that never keep a directory alive
pub const IGNORABLE_ENTRIES: &[&str] = &["Thumbs.db", ".DS_Store"];

/// Rejects thumbnail caches and desktop service markers (case-insensitive suffix match)
pub fn default_empty_dir_filter() -> EmptyDirFilter {
    Arc::new(|name: &str| {
        let lower = name.to_lowercase();
        !IGNORABLE_ENTRIES
            .iter()
            .any(|artifact| lower.ends_with(&artifact.to_lowercase()))
    })
}
