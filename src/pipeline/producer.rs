use super::queue::WorkQueue;
use crate::client::ListClient;
use crate::error::PipelineError;

/// What the producer pushed into the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub pages: usize,
    pub listed: usize,
}

/// Page through `query`, enqueuing every listed message.
///
/// Stops when a page comes back without a next-page token. Any listing error
/// aborts paging and is returned as [`PipelineError::Listing`]. If the queue
/// gets closed underneath (the dispatcher hit a fatal error) paging stops early
/// and the dispatcher's error is what the caller sees.
pub async fn produce(
    client: &dyn ListClient,
    query: &str,
    page_size: u32,
    queue: &WorkQueue,
) -> Result<ProducerStats, PipelineError> {
    let mut stats = ProducerStats::default();
    let mut page_token: Option<String> = None;

    loop {
        let page = client
            .list(query, page_token.as_deref(), page_size)
            .await
            .map_err(|e| {
                log::error!("listing page {} for `{}` failed: {}", stats.pages + 1, query, e);
                PipelineError::listing(query, stats.pages, e)
            })?;

        stats.pages += 1;
        log::info!("listing page {}: {} messages", stats.pages, page.messages.len());

        for message in page.messages {
            if !queue.enqueue(message) {
                log::warn!("work queue closed, stopping listing after {} pages", stats.pages);
                return Ok(stats);
            }
            stats.listed += 1;
        }

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    log::info!("listing done: {} messages over {} pages", stats.listed, stats.pages);
    Ok(stats)
}
