//! Contracts for the remote message service.
//!
//! The pipeline only ever talks to these two traits. The production
//! implementation lives in [`crate::gmail`]; tests drive the pipeline with
//! in-memory implementations.

mod error;

pub use error::ClientError;

use crate::models::{MessageDetail, MessagePage};
use async_trait::async_trait;

/// Paginated listing of message ids matching a query.
#[async_trait]
pub trait ListClient: Send + Sync {
    /// Fetch one page. `page_token` is `None` for the first page.
    async fn list(
        &self,
        query: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<MessagePage, ClientError>;
}

/// Per-message detail lookup.
#[async_trait]
pub trait DetailClient: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<MessageDetail, ClientError>;
}
