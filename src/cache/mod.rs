//! Persistent cache of resolved messages.
//!
//! Remote detail lookups are the slow part of a run, so every resolved
//! message is written through to disk and later runs read it back instead of
//! asking the service again.
//!
//! ## Architecture
//!
//! - [`KeyValueStore`] is a generic on-disk keyed store. Keys are namespaced by
//!   a collection tag (`{type_tag}-{key}`) so several logical collections can
//!   share one file. Tags may not contain `-`.
//! - [`MessageCache`] is the narrow contract the pipeline depends on.
//! - [`DiskMessageCache`] implements it on top of a `KeyValueStore`.

mod message_cache;
mod store;
mod types;

pub use message_cache::{DiskMessageCache, MessageCache};
pub use store::KeyValueStore;
pub use types::CacheError;
