//! Concurrent fetch-cache pipeline.
//!
//! This module resolves the sender of every message matching a query while
//! issuing as few remote detail calls as possible.
//!
//! # Architecture Overview
//!
//! - **`producer`**: Pages through the listing API and pushes every message id
//!   into the work queue. A listing failure is fatal for the run.
//!
//! - **`queue`**: Unbounded FIFO between producer and dispatcher. The
//!   dispatcher suspends on it instead of busy-polling; closing it is the
//!   "no more input" signal.
//!
//! - **`dispatcher`**: Drains the queue. Cache hits go straight to the result
//!   set; misses are handed to a bounded pool of fetch tasks.
//!
//! - **`fetch`**: The cache-miss operation. Fetches the message, extracts the
//!   `From` header, writes the result through to the cache and records it.
//!
//! - **`results`**: The shared result set plus the per-run outcome types.
//!
//! ## Data Flow
//!
//! 1. **Listing**: producer enqueues ids page by page
//! 2. **Dispatch**: dispatcher pulls ids concurrently with listing
//! 3. **Resolve**: cache hit, or remote fetch + write-through
//! 4. **Drain**: once listing finishes the dispatcher is stopped, finishes the
//!    queue, and waits for every in-flight fetch
//! 5. **Report**: the caller receives a [`RunOutcome`]
//!
//! ## Failure Model
//!
//! Per-message problems (failed detail call, missing `From` header) are
//! recorded as [`FetchFailure`]s and never stop the run. Listing failures,
//! cache failures and panicked tasks abort it with a [`PipelineError`].

pub mod dispatcher;
pub mod fetch;
pub mod producer;
pub mod queue;
pub mod results;

pub use dispatcher::{DispatcherHandle, DispatcherState, FetchDispatcher};
pub use fetch::ItemError;
pub use producer::ProducerStats;
pub use queue::WorkQueue;
pub use results::{FetchFailure, ResultSet, RunOutcome, RunStats};

use crate::cache::MessageCache;
use crate::client::{DetailClient, ListClient};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use std::sync::Arc;
use std::time::Instant;

/// Run the whole pipeline for `query` and wait for it to drain.
///
/// The producer and the dispatcher run concurrently. When listing finishes the
/// dispatcher is stopped and joined, so the returned outcome accounts for every
/// listed message. If listing fails, work that was already queued is still
/// drained (and cached) before the listing error is returned.
pub async fn run(
    list_client: Arc<dyn ListClient>,
    detail_client: Arc<dyn DetailClient>,
    cache: Arc<dyn MessageCache>,
    query: &str,
    config: &PipelineConfig,
) -> Result<RunOutcome, PipelineError> {
    let started = Instant::now();
    log::info!(
        "starting run for `{}` (page size {}, concurrency {})",
        query,
        config.page_size,
        config.concurrency
    );

    let queue = Arc::new(WorkQueue::new());
    let dispatcher =
        FetchDispatcher::new(Arc::clone(&queue), cache, detail_client, config).spawn();

    let producer = {
        let queue = Arc::clone(&queue);
        let query = query.to_string();
        let page_size = config.page_size;
        tokio::spawn(async move {
            producer::produce(list_client.as_ref(), &query, page_size, &queue).await
        })
    };

    let listed = match producer.await {
        Ok(result) => result,
        Err(e) => Err(PipelineError::TaskFailed(format!("list producer task: {}", e))),
    };

    dispatcher.stop();
    let drained = dispatcher.join().await;

    let producer_stats = match listed {
        Ok(stats) => stats,
        Err(e) => {
            match &drained {
                Ok(outcome) => log::warn!(
                    "listing aborted; {} messages resolved before the failure were cached",
                    outcome.resolved.len()
                ),
                Err(dispatch_err) => log::error!("dispatcher also failed: {}", dispatch_err),
            }
            return Err(e);
        }
    };

    let outcome = drained?;
    log::info!(
        "run complete in {:.2}s: {} listed, {} resolved, {} cache hits, {} remote fetches, {} failures",
        started.elapsed().as_secs_f64(),
        producer_stats.listed,
        outcome.resolved.len(),
        outcome.stats.cache_hits,
        outcome.stats.remote_fetches,
        outcome.stats.failures
    );

    Ok(outcome)
}
