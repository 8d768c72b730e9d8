use crate::cache::CacheError;
use crate::client::ClientError;
use thiserror::Error;

/// Errors that abort a whole run.
///
/// Per-message problems never end up here; they are collected as
/// [`FetchFailure`](crate::pipeline::FetchFailure)s instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The listing stopped early, so any count would be silently low.
    #[error("listing for query `{query}` failed after {pages_fetched} pages: {source}")]
    Listing {
        query: String,
        pages_fetched: usize,
        #[source]
        source: ClientError,
    },
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("fetch task failed: {0}")]
    TaskFailed(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn listing(query: &str, pages_fetched: usize, source: ClientError) -> Self {
        PipelineError::Listing {
            query: query.to_string(),
            pages_fetched,
            source,
        }
    }
}
