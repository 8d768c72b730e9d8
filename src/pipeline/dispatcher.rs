use super::fetch::fetch_and_store;
use super::queue::WorkQueue;
use super::results::{ResultSet, RunOutcome, RunStats};
use crate::cache::{CacheError, MessageCache};
use crate::client::DetailClient;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};

/// Lifecycle of a [`FetchDispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Accepting work and spawning fetches.
    Running,
    /// No more input expected; finishing what is queued or in flight.
    Draining,
    /// Queue empty and every spawned fetch has completed.
    Done,
}

/// Drains the work queue, answering from the cache where possible and
/// spawning a bounded number of concurrent remote fetches for misses.
pub struct FetchDispatcher {
    queue: Arc<WorkQueue>,
    cache: Arc<dyn MessageCache>,
    client: Arc<dyn DetailClient>,
    results: Arc<ResultSet>,
    permits: Arc<Semaphore>,
    idle_backoff: Duration,
    state: Arc<watch::Sender<DispatcherState>>,
}

/// Caller-side handle to a running dispatcher.
pub struct DispatcherHandle {
    queue: Arc<WorkQueue>,
    state: Arc<watch::Sender<DispatcherState>>,
    task: JoinHandle<Result<RunOutcome, PipelineError>>,
}

impl FetchDispatcher {
    pub fn new(
        queue: Arc<WorkQueue>,
        cache: Arc<dyn MessageCache>,
        client: Arc<dyn DetailClient>,
        config: &PipelineConfig,
    ) -> Self {
        let (state, _) = watch::channel(DispatcherState::Running);
        Self {
            queue,
            cache,
            client,
            results: Arc::new(ResultSet::new()),
            permits: Arc::new(Semaphore::new(config.concurrency.max(1))),
            idle_backoff: config.idle_backoff,
            state: Arc::new(state),
        }
    }

    /// Start the dispatch loop on the runtime.
    pub fn spawn(self) -> DispatcherHandle {
        let queue = Arc::clone(&self.queue);
        let state = Arc::clone(&self.state);
        let task = tokio::spawn(self.run());

        DispatcherHandle { queue, state, task }
    }

    async fn run(self) -> Result<RunOutcome, PipelineError> {
        log::debug!("dispatcher: running");

        let mut tasks: JoinSet<Result<(), CacheError>> = JoinSet::new();
        let mut stats = RunStats::default();
        let mut fatal: Option<PipelineError> = None;

        while let Some(message) = self.queue.next(self.idle_backoff).await {
            stats.dispatched += 1;

            match self.cache.get(&message.id) {
                Ok(Some(cached)) => {
                    stats.cache_hits += 1;
                    log::trace!("cache hit for {}", message.id);
                    self.results.push_resolved(cached);
                }
                Ok(None) => {
                    stats.remote_fetches += 1;
                    log::trace!("cache miss for {}", message.id);

                    let permit = match Arc::clone(&self.permits).acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            fatal = Some(PipelineError::TaskFailed(
                                "fetch pool closed unexpectedly".to_string(),
                            ));
                            break;
                        }
                    };

                    let client = Arc::clone(&self.client);
                    let cache = Arc::clone(&self.cache);
                    let results = Arc::clone(&self.results);
                    tasks.spawn(async move {
                        let _permit = permit;
                        fetch_and_store(client.as_ref(), cache, &results, message).await
                    });
                }
                Err(e) => {
                    log::error!("dispatcher: cache lookup for {} failed: {}", message.id, e);
                    fatal = Some(e.into());
                    break;
                }
            }

            // Reap whatever finished so the join set stays small
            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = task_result(joined) {
                    fatal = Some(e);
                    break;
                }
            }
            if fatal.is_some() {
                break;
            }
        }

        if fatal.is_some() {
            log::error!("dispatcher: fatal error, no longer accepting work");
            self.queue.close();
            self.mark(DispatcherState::Draining);
        }

        log::debug!("dispatcher: waiting on {} in-flight fetches", tasks.len());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = task_result(joined) {
                log::error!("dispatcher: {}", e);
                fatal.get_or_insert(e);
            }
        }

        let (resolved, failures) = self.results.take();
        stats.failures = failures.len();
        self.mark(DispatcherState::Done);

        log::debug!(
            "dispatcher: done - {} dispatched, {} cache hits, {} remote fetches, {} failures",
            stats.dispatched,
            stats.cache_hits,
            stats.remote_fetches,
            stats.failures
        );

        match fatal {
            Some(e) => Err(e),
            None => Ok(RunOutcome {
                resolved,
                failures,
                stats,
            }),
        }
    }

    fn mark(&self, next: DispatcherState) {
        transition(&self.state, next);
    }
}

impl DispatcherHandle {
    pub fn state(&self) -> DispatcherState {
        *self.state.borrow()
    }

    /// Signal that no more input will arrive. Queued and in-flight work is
    /// still processed.
    pub fn stop(&self) {
        self.queue.close();
        transition(&self.state, DispatcherState::Draining);
    }

    /// Wait until the queue is drained and every spawned fetch has finished.
    ///
    /// Only call after [`stop`](Self::stop); otherwise this waits for a stop
    /// that never comes.
    pub async fn join(self) -> Result<RunOutcome, PipelineError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::TaskFailed(format!("dispatcher task: {}", e))),
        }
    }
}

/// Advance the state machine; never moves backwards.
fn transition(state: &watch::Sender<DispatcherState>, next: DispatcherState) {
    state.send_if_modified(|current| {
        let advance = matches!(
            (*current, next),
            (DispatcherState::Running, DispatcherState::Draining)
                | (DispatcherState::Running, DispatcherState::Done)
                | (DispatcherState::Draining, DispatcherState::Done)
        );
        if advance {
            log::debug!("dispatcher: {:?} -> {:?}", current, next);
            *current = next;
        }
        advance
    });
}

fn task_result(joined: Result<Result<(), CacheError>, JoinError>) -> Result<(), PipelineError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(PipelineError::Cache(e)),
        Err(e) => Err(PipelineError::TaskFailed(e.to_string())),
    }
}
