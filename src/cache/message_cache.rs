use super::{CacheError, KeyValueStore};
use crate::models::ResolvedMessage;
use std::path::Path;

/// Cache of resolved messages keyed by message id.
///
/// Implementations must be safe to call concurrently from many fetch tasks.
pub trait MessageCache: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<ResolvedMessage>, CacheError>;

    /// Insert or replace the entry for `message.id`.
    fn upsert(&self, message: &ResolvedMessage) -> Result<(), CacheError>;

    /// Remove every cached message. Returns the number removed.
    fn erase_all(&self) -> Result<usize, CacheError>;
}

/// [`MessageCache`] backed by a [`KeyValueStore`] file.
pub struct DiskMessageCache {
    store: KeyValueStore,
}

impl DiskMessageCache {
    /// Collection tag for resolved messages inside the store.
    pub const COLLECTION: &'static str = "ResolvedMessage";

    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        Ok(Self {
            store: KeyValueStore::open(path)?,
        })
    }

    pub fn from_store(store: KeyValueStore) -> Self {
        Self { store }
    }

    pub fn len(&self) -> usize {
        self.store.len(Self::COLLECTION)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MessageCache for DiskMessageCache {
    fn get(&self, id: &str) -> Result<Option<ResolvedMessage>, CacheError> {
        self.store.get(Self::COLLECTION, id)
    }

    fn upsert(&self, message: &ResolvedMessage) -> Result<(), CacheError> {
        self.store.store(Self::COLLECTION, &message.id, message)
    }

    fn erase_all(&self) -> Result<usize, CacheError> {
        let removed = self.store.clear(Self::COLLECTION)?;
        log::info!("erased {} cached messages from {}", removed, self.store.path().display());
        Ok(removed)
    }
}
