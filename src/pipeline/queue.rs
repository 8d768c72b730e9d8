//! Work queue between the list producer and the fetch dispatcher.

use crate::models::MessageRef;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Unbounded FIFO of message ids waiting for dispatch.
///
/// Appended to by the producer, drained by the dispatcher. Closing the queue
/// means no more input will arrive; items already queued stay available.
#[derive(Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<MessageRef>>,
    closed: AtomicBool,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Returns `false` if the queue was already closed.
    pub fn enqueue(&self, message: MessageRef) -> bool {
        let mut items = self.items.lock();
        if self.is_closed() {
            log::warn!("work queue closed, dropping late message {}", message.id);
            return false;
        }

        items.push_back(message);
        drop(items);
        self.notify.notify_one();
        true
    }

    /// Remove and return the oldest message, if any.
    pub fn try_dequeue(&self) -> Option<MessageRef> {
        self.items.lock().pop_front()
    }

    /// Pending count. Only meaningful as a hint.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signal that the producer is finished.
    pub fn close(&self) {
        {
            let _items = self.items.lock();
            self.closed.store(true, Ordering::SeqCst);
        }
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the queue is closed and empty. Each suspension lasts
    /// at most `idle_backoff` before the state is re-checked.
    pub async fn next(&self, idle_backoff: Duration) -> Option<MessageRef> {
        loop {
            // Register before checking so a concurrent close() is not missed
            let notified = self.notify.notified();

            if let Some(message) = self.try_dequeue() {
                return Some(message);
            }
            if self.is_closed() {
                return self.try_dequeue();
            }

            let _ = tokio::time::timeout(idle_backoff, notified).await;
        }
    }
}
