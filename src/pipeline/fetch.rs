//! Cache-miss fetch operation.
//!
//! Resolves one message through the detail client, writes the result through
//! to the cache, and records the outcome in the shared [`ResultSet`].
//! Per-message problems are recorded as failures; only a cache failure is
//! returned to the caller, because the pipeline cannot reason about a
//! partially written cache.

use super::results::ResultSet;
use crate::cache::{CacheError, MessageCache};
use crate::client::{ClientError, DetailClient};
use crate::models::{MessageDetail, MessageRef, ResolvedMessage, SENDER_HEADER};
use std::sync::Arc;
use thiserror::Error;

/// Errors scoped to a single message. These never abort a run.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("detail fetch for message {id} failed: {source}")]
    DetailFetch {
        id: String,
        #[source]
        source: ClientError,
    },
    #[error("message {id} is malformed: {reason}")]
    MalformedMessage { id: String, reason: String },
}

/// Pull the sender header out of a fetched message.
///
/// `id` is the id that was requested; it wins over whatever the service echoes
/// back so results always line up with the queued refs.
pub fn extract_sender(id: &str, detail: &MessageDetail) -> Result<ResolvedMessage, ItemError> {
    if !detail.id.is_empty() && detail.id != id {
        log::debug!("message {} came back with id {}", id, detail.id);
    }

    let sender = detail
        .header(SENDER_HEADER)
        .ok_or_else(|| ItemError::MalformedMessage {
            id: id.to_string(),
            reason: format!("no {} header", SENDER_HEADER),
        })?
        .trim();

    if sender.is_empty() {
        return Err(ItemError::MalformedMessage {
            id: id.to_string(),
            reason: format!("empty {} header", SENDER_HEADER),
        });
    }

    Ok(ResolvedMessage::new(id, sender))
}

/// Fetch a single message and extract its sender.
pub async fn resolve_message(
    client: &dyn DetailClient,
    id: &str,
) -> Result<ResolvedMessage, ItemError> {
    let detail = client
        .fetch(id)
        .await
        .map_err(|source| ItemError::DetailFetch {
            id: id.to_string(),
            source,
        })?;

    extract_sender(id, &detail)
}

/// Write `message` through to `cache` on the blocking pool; the upsert does
/// synchronous file I/O.
async fn write_through(
    cache: Arc<dyn MessageCache>,
    message: ResolvedMessage,
) -> Result<ResolvedMessage, CacheError> {
    tokio::task::spawn_blocking(move || cache.upsert(&message).map(|()| message))
        .await
        .map_err(|e| CacheError::WriteTaskFailed(e.to_string()))?
}

/// Resolve `message` remotely, write it through to `cache`, and record the
/// outcome in `results`.
pub async fn fetch_and_store(
    client: &dyn DetailClient,
    cache: Arc<dyn MessageCache>,
    results: &ResultSet,
    message: MessageRef,
) -> Result<(), CacheError> {
    match resolve_message(client, &message.id).await {
        Ok(resolved) => {
            let resolved = write_through(cache, resolved).await?;
            log::trace!("resolved {} -> {}", resolved.id, resolved.sender);
            results.push_resolved(resolved);
        }
        Err(error) => {
            match &error {
                ItemError::DetailFetch { source, .. } if source.is_not_found() => {
                    log::warn!("message {} no longer exists, skipping", message.id);
                }
                _ => log::warn!("skipping message {}: {}", message.id, error),
            }
            results.push_failure(message.id, error);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageHeader;

    fn detail(id: &str, headers: Vec<MessageHeader>) -> MessageDetail {
        MessageDetail {
            id: id.to_string(),
            headers,
        }
    }

    #[test]
    fn test_extract_sender() {
        let d = detail(
            "a",
            vec![
                MessageHeader::new("Subject", "hi"),
                MessageHeader::new("from", "  X <x@example.com> "),
            ],
        );

        let resolved = extract_sender("a", &d).unwrap();
        assert_eq!(resolved, ResolvedMessage::new("a", "X <x@example.com>"));
    }

    #[test]
    fn test_extract_sender_missing_header() {
        let d = detail("a", vec![MessageHeader::new("Subject", "hi")]);

        let err = extract_sender("a", &d).unwrap_err();
        assert!(matches!(err, ItemError::MalformedMessage { ref id, .. } if id == "a"));
    }

    #[test]
    fn test_extract_sender_blank_header() {
        let d = detail("a", vec![MessageHeader::new("From", "   ")]);

        assert!(matches!(
            extract_sender("a", &d),
            Err(ItemError::MalformedMessage { .. })
        ));
    }

    #[test]
    fn test_extract_sender_keeps_requested_id() {
        let d = detail("other", vec![MessageHeader::new("From", "x@example.com")]);

        assert_eq!(extract_sender("a", &d).unwrap().id, "a");
    }

    /// Records the thread each upsert ran on.
    #[derive(Default)]
    struct ThreadRecordingCache {
        writes: parking_lot::Mutex<Vec<(String, std::thread::ThreadId)>>,
    }

    impl MessageCache for ThreadRecordingCache {
        fn get(&self, _id: &str) -> Result<Option<ResolvedMessage>, CacheError> {
            Ok(None)
        }

        fn upsert(&self, message: &ResolvedMessage) -> Result<(), CacheError> {
            self.writes
                .lock()
                .push((message.id.clone(), std::thread::current().id()));
            Ok(())
        }

        fn erase_all(&self) -> Result<usize, CacheError> {
            Ok(0)
        }
    }

    struct FixedClient;

    #[async_trait::async_trait]
    impl DetailClient for FixedClient {
        async fn fetch(&self, id: &str) -> Result<MessageDetail, ClientError> {
            Ok(detail(id, vec![MessageHeader::new("From", "x@example.com")]))
        }
    }

    #[tokio::test]
    async fn test_fetch_and_store_writes_off_the_runtime_thread() {
        let cache = Arc::new(ThreadRecordingCache::default());
        let results = ResultSet::new();

        fetch_and_store(&FixedClient, cache.clone(), &results, MessageRef::new("a"))
            .await
            .unwrap();

        let writes = cache.writes.lock();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, "a");
        // The current-thread runtime drives this test on the test thread
        assert_ne!(writes[0].1, std::thread::current().id());

        let (resolved, failures) = results.take();
        assert_eq!(resolved, vec![ResolvedMessage::new("a", "x@example.com")]);
        assert!(failures.is_empty());
    }
}
