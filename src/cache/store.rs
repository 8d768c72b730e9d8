//! Append-only on-disk key-value store
//!
//! ## Design
//!
//! - Uses DashMap as the in-memory index so concurrent fetch tasks can read
//!   without contending on the writer
//! - Every upsert or delete is appended to a journal file and flushed before
//!   the in-memory index changes
//! - On open, the journal is replayed and then compacted down to live keys
//!
//! ## File format
//!
//! `{version: u32 LE}` followed by records of `{len: u32 LE}{bincode StoredRecord}`.
//! A record cut short by a crash is dropped on the next open.

use super::CacheError;
use super::types::StoredRecord;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Keyed store persisted as a bincode journal.
pub struct KeyValueStore {
    path: PathBuf,

    /// Live entries keyed by composite `{type_tag}-{key}`
    entries: DashMap<String, Vec<u8>>,

    /// Single writer; held across the append and the index update so the
    /// journal order matches the in-memory order
    writer: Mutex<BufWriter<File>>,
}

impl KeyValueStore {
    /// Current journal format version
    const JOURNAL_VERSION: u32 = 1;

    /// Open (or create) the store at `path`.
    ///
    /// ## Errors
    ///
    /// Returns `CacheError::VersionMismatch` if the file was written by an
    /// incompatible version, `CacheError::IoError` on filesystem failures.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let entries = DashMap::new();
        if path.exists() {
            let data = std::fs::read(&path)?;
            replay(&data, &entries)?;
        }

        compact(&path, &entries)?;

        let file = OpenOptions::new().append(true).open(&path)?;

        log::info!(
            "opened cache store {}: {} live entries",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path,
            entries,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Collection tags end at the first `-` of a composite key, so a tag may
    /// not contain one.
    fn is_valid_tag(type_tag: &str) -> bool {
        !type_tag.is_empty() && !type_tag.contains('-')
    }

    /// Composite key for an entry in collection `type_tag`.
    pub fn stored_key(type_tag: &str, key: &str) -> Result<String, CacheError> {
        if !Self::is_valid_tag(type_tag) {
            return Err(CacheError::InvalidTypeTag(type_tag.to_string()));
        }
        Ok(format!("{}-{}", type_tag, key))
    }

    /// Insert or replace `key` in collection `type_tag`.
    pub fn store<T: Serialize>(&self, type_tag: &str, key: &str, value: &T) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }

        let stored_key = Self::stored_key(type_tag, key)?;
        let bytes =
            bincode::serialize(value).map_err(|e| CacheError::SerializeError(e.to_string()))?;

        let mut writer = self.writer.lock();
        append_record(
            &mut *writer,
            &StoredRecord {
                key: stored_key.clone(),
                value: Some(bytes.clone()),
            },
        )?;
        writer.flush()?;
        self.entries.insert(stored_key, bytes);

        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, type_tag: &str, key: &str) -> Result<Option<T>, CacheError> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }

        let stored_key = Self::stored_key(type_tag, key)?;
        match self.entries.get(&stored_key) {
            Some(entry) => bincode::deserialize(entry.value())
                .map(Some)
                .map_err(|e| CacheError::DeserializeError(e.to_string())),
            None => Ok(None),
        }
    }

    /// Remove a single entry. Returns whether it existed.
    pub fn delete(&self, type_tag: &str, key: &str) -> Result<bool, CacheError> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }

        let stored_key = Self::stored_key(type_tag, key)?;
        let mut writer = self.writer.lock();
        if !self.entries.contains_key(&stored_key) {
            return Ok(false);
        }

        append_record(
            &mut *writer,
            &StoredRecord {
                key: stored_key.clone(),
                value: None,
            },
        )?;
        writer.flush()?;
        self.entries.remove(&stored_key);

        Ok(true)
    }

    /// Drop every entry of collection `type_tag`. Returns the number removed.
    pub fn clear(&self, type_tag: &str) -> Result<usize, CacheError> {
        let prefix = Self::stored_key(type_tag, "")?;

        let mut writer = self.writer.lock();
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| entry.key().clone())
            .collect();

        for key in &doomed {
            append_record(
                &mut *writer,
                &StoredRecord {
                    key: key.clone(),
                    value: None,
                },
            )?;
        }
        writer.flush()?;

        for key in &doomed {
            self.entries.remove(key);
        }

        log::debug!("cleared {} entries from collection {}", doomed.len(), type_tag);
        Ok(doomed.len())
    }

    /// Number of live entries in collection `type_tag`; always zero for an
    /// invalid tag since nothing can be stored under one.
    pub fn len(&self, type_tag: &str) -> usize {
        let Ok(prefix) = Self::stored_key(type_tag, "") else {
            return 0;
        };
        self.entries
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .count()
    }

    pub fn is_empty(&self, type_tag: &str) -> bool {
        self.len(type_tag) == 0
    }
}

fn append_record<W: Write>(writer: &mut W, record: &StoredRecord) -> Result<(), CacheError> {
    let bytes =
        bincode::serialize(record).map_err(|e| CacheError::SerializeError(e.to_string()))?;
    let len = u32::try_from(bytes.len())
        .map_err(|_| CacheError::SerializeError(format!("record for {} too large", record.key)))?;

    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&bytes)?;
    Ok(())
}

fn replay(data: &[u8], entries: &DashMap<String, Vec<u8>>) -> Result<(), CacheError> {
    if data.is_empty() {
        return Ok(());
    }
    if data.len() < 4 {
        log::warn!("cache journal header truncated, starting empty");
        return Ok(());
    }

    let version = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    if version != KeyValueStore::JOURNAL_VERSION {
        return Err(CacheError::VersionMismatch {
            expected: KeyValueStore::JOURNAL_VERSION,
            found: version,
        });
    }

    let mut pos = 4;
    let mut applied = 0usize;
    while pos < data.len() {
        if data.len() - pos < 4 {
            log::warn!("cache journal has a truncated record at byte {}, dropping it", pos);
            break;
        }
        let len = u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let start = pos + 4;
        let end = start + len;
        if end > data.len() {
            log::warn!("cache journal has a truncated record at byte {}, dropping it", pos);
            break;
        }

        let record: StoredRecord = match bincode::deserialize(&data[start..end]) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("cache journal record at byte {} is unreadable ({}), dropping tail", pos, e);
                break;
            }
        };

        match record.value {
            Some(value) => {
                entries.insert(record.key, value);
            }
            None => {
                entries.remove(&record.key);
            }
        }

        applied += 1;
        pos = end;
    }

    log::debug!("replayed {} cache journal records", applied);
    Ok(())
}

/// Rewrite the journal so it holds exactly one record per live key.
fn compact(path: &Path, entries: &DashMap<String, Vec<u8>>) -> Result<(), CacheError> {
    let tmp_path = path.with_extension("compact");

    {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        writer.write_all(&KeyValueStore::JOURNAL_VERSION.to_le_bytes())?;
        for entry in entries.iter() {
            append_record(
                &mut writer,
                &StoredRecord {
                    key: entry.key().clone(),
                    value: Some(entry.value().clone()),
                },
            )?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyValueStore::open(dir.path().join("store.bin")).unwrap();

        store.store("Token", "user", &"secret".to_string()).unwrap();

        let value: Option<String> = store.get("Token", "user").unwrap();
        assert_eq!(value.as_deref(), Some("secret"));

        let missing: Option<String> = store.get("Token", "other").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_empty_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyValueStore::open(dir.path().join("store.bin")).unwrap();

        let err = store.store("Token", "", &1u32).unwrap_err();
        assert!(matches!(err, CacheError::EmptyKey));
        assert!(matches!(store.get::<u32>("Token", ""), Err(CacheError::EmptyKey)));
    }

    #[test]
    fn test_collections_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyValueStore::open(dir.path().join("store.bin")).unwrap();

        store.store("A", "1", &1u32).unwrap();
        store.store("A", "2", &2u32).unwrap();
        store.store("B", "1", &10u32).unwrap();

        assert_eq!(store.clear("A").unwrap(), 2);
        assert!(store.is_empty("A"));
        assert_eq!(store.get::<u32>("B", "1").unwrap(), Some(10));
    }

    #[test]
    fn test_dashed_type_tag_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyValueStore::open(dir.path().join("store.bin")).unwrap();

        store.store("Token", "user", &1u32).unwrap();
        assert!(matches!(
            store.store("Token-v2", "user", &2u32),
            Err(CacheError::InvalidTypeTag(ref tag)) if tag == "Token-v2"
        ));
        assert!(matches!(
            store.get::<u32>("Token-v2", "user"),
            Err(CacheError::InvalidTypeTag(_))
        ));
        assert!(matches!(store.clear("Token-v2"), Err(CacheError::InvalidTypeTag(_))));
        assert!(matches!(store.store("", "user", &1u32), Err(CacheError::InvalidTypeTag(_))));
        assert_eq!(store.len("Token-v2"), 0);

        // Similar-looking tags stay independent
        store.store("TokenV2", "user", &2u32).unwrap();
        assert_eq!(store.len("Token"), 1);
        assert_eq!(store.clear("Token").unwrap(), 1);
        assert_eq!(store.get::<u32>("TokenV2", "user").unwrap(), Some(2));
    }

    #[test]
    fn test_reopen_replays_upserts_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");

        {
            let store = KeyValueStore::open(&path).unwrap();
            store.store("A", "1", &1u32).unwrap();
            store.store("A", "1", &11u32).unwrap();
            store.store("A", "2", &2u32).unwrap();
            assert!(store.delete("A", "2").unwrap());
            assert!(!store.delete("A", "3").unwrap());
        }

        let store = KeyValueStore::open(&path).unwrap();
        assert_eq!(store.get::<u32>("A", "1").unwrap(), Some(11));
        assert_eq!(store.get::<u32>("A", "2").unwrap(), None);
        assert_eq!(store.len("A"), 1);
    }

    #[test]
    fn test_truncated_tail_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");

        {
            let store = KeyValueStore::open(&path).unwrap();
            store.store("A", "1", &1u32).unwrap();
        }

        // Simulate a crash halfway through writing a second record
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
        drop(file);

        let store = KeyValueStore::open(&path).unwrap();
        assert_eq!(store.get::<u32>("A", "1").unwrap(), Some(1));
        assert_eq!(store.len("A"), 1);

        // Compaction removed the partial record, so new writes survive a reopen
        store.store("A", "2", &2u32).unwrap();
        drop(store);
        let store = KeyValueStore::open(&path).unwrap();
        assert_eq!(store.get::<u32>("A", "2").unwrap(), Some(2));
    }

    #[test]
    fn test_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");
        std::fs::write(&path, 99u32.to_le_bytes()).unwrap();

        let err = KeyValueStore::open(&path).err().unwrap();
        assert!(matches!(
            err,
            CacheError::VersionMismatch { expected: 1, found: 99 }
        ));
    }
}
