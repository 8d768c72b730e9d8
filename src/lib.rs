//! Sender frequency statistics for a Gmail query.
//!
//! Lists every message matching a query, resolves each message's `From`
//! header (from a persistent local cache where possible, from the API
//! otherwise), and ranks senders by message count.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod gmail;
pub mod models;
pub mod pipeline;
pub mod report;

pub use error::PipelineError;
