use super::fetch::ItemError;
use crate::models::ResolvedMessage;
use parking_lot::Mutex;

/// A message that could not be resolved during a run.
#[derive(Debug)]
pub struct FetchFailure {
    pub id: String,
    pub error: ItemError,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Message refs taken off the work queue.
    pub dispatched: usize,
    pub cache_hits: usize,
    /// Detail calls issued (cache misses).
    pub remote_fetches: usize,
    pub failures: usize,
}

/// Everything a finished run produced.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub resolved: Vec<ResolvedMessage>,
    pub failures: Vec<FetchFailure>,
    pub stats: RunStats,
}

impl RunOutcome {
    /// Every dispatched ref has exactly one outcome.
    pub fn is_complete(&self) -> bool {
        self.resolved.len() + self.failures.len() == self.stats.dispatched
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Append-only collection of per-message outcomes shared by the dispatcher
/// and its fetch tasks.
///
/// Resolved messages and failures sit behind separate locks; neither is ever
/// held while taking the other.
#[derive(Default)]
pub struct ResultSet {
    resolved: Mutex<Vec<ResolvedMessage>>,
    failures: Mutex<Vec<FetchFailure>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_resolved(&self, message: ResolvedMessage) {
        self.resolved.lock().push(message);
    }

    pub fn push_failure(&self, id: String, error: ItemError) {
        self.failures.lock().push(FetchFailure { id, error });
    }

    /// Move everything recorded so far out of the set.
    pub fn take(&self) -> (Vec<ResolvedMessage>, Vec<FetchFailure>) {
        let resolved = std::mem::take(&mut *self.resolved.lock());
        let failures = std::mem::take(&mut *self.failures.lock());
        (resolved, failures)
    }
}
