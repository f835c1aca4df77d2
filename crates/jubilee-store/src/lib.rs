//! # Jubilee Store
//! Durable user → birthdate mapping backed by a single JSON file.
//!
//! The file is the same shape the bot has always written:
//! `{ "<user id>": "DD.MM.YYYY", ... }`, so a fresh process can always
//! re-read it. Writes go through a temp file + rename so a crash mid-save
//! never leaves a torn store behind.
//!
//! One store instance owns the map and the backing file. Callers share it
//! as an `Arc<tokio::sync::Mutex<BirthdayStore>>`; every mutation persists
//! before returning, so an observed `Ok` implies durability.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jubilee_core::{BirthDate, Error, Result};
use tokio::sync::Mutex;

/// Shared handle used by command handlers and scheduled jobs.
pub type SharedStore = Arc<Mutex<BirthdayStore>>;

/// Birthday records keyed by user id, persisted as one JSON object.
pub struct BirthdayStore {
    path: PathBuf,
    entries: HashMap<String, BirthDate>,
}

impl BirthdayStore {
    /// Open the store at `path`. A missing file means first run: start
    /// empty and create it. An unparseable existing file is fatal — better
    /// to stop than to silently clobber someone's records on the next save.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            serde_json::from_str(&text)
                .map_err(|e| Error::store(format!("{} is corrupt: {e}", path.display())))?
        } else {
            HashMap::new()
        };

        let store = Self { path, entries };
        if !store.path.exists() {
            store.save()?;
        }
        tracing::debug!("birthday store opened: {} ({} records)", store.path.display(), store.len());
        Ok(store)
    }

    /// Persist the full map atomically (write temp, then rename over).
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| Error::store(format!("write failed: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| Error::store(format!("rename failed: {e}")))?;
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Option<BirthDate> {
        self.entries.get(user_id).copied()
    }

    /// Insert a record and persist. Only called once consent is finalized.
    /// A failed save rolls the insertion back, keeping memory and disk in
    /// agreement at the last good state.
    pub fn set(&mut self, user_id: impl Into<String>, date: BirthDate) -> Result<()> {
        let user_id = user_id.into();
        let previous = self.entries.insert(user_id.clone(), date);
        if let Err(e) = self.save() {
            match previous {
                Some(old) => self.entries.insert(user_id, old),
                None => self.entries.remove(&user_id),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Remove a record and persist. Returns whether a record existed.
    /// A failed save restores the removed record.
    pub fn delete(&mut self, user_id: &str) -> Result<bool> {
        let Some(removed) = self.entries.remove(user_id) else {
            return Ok(false);
        };
        if let Err(e) = self.save() {
            self.entries.insert(user_id.to_string(), removed);
            return Err(e);
        }
        Ok(true)
    }

    /// Consistent copy of all records, for announcement scans and listing.
    /// Taken under one lock acquisition by the caller.
    pub fn snapshot(&self) -> Vec<(String, BirthDate)> {
        self.entries
            .iter()
            .map(|(id, date)| (id.clone(), *date))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bd(s: &str) -> BirthDate {
        BirthDate::parse(s).expect("valid test date")
    }

    #[test]
    fn test_first_run_creates_empty_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("birthdays.json");
        let store = BirthdayStore::load(&path).expect("should init");
        assert!(store.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_set_get_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = BirthdayStore::load(dir.path().join("b.json")).expect("init");

        store.set("42", bd("25.12.1990")).expect("set");
        assert_eq!(store.get("42"), Some(bd("25.12.1990")));

        assert!(store.delete("42").expect("delete"));
        assert_eq!(store.get("42"), None);
        assert!(!store.delete("42").expect("second delete"));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("b.json");
        {
            let mut store = BirthdayStore::load(&path).expect("init");
            store.set("1", bd("01.01.2000")).expect("set");
            store.set("2", bd("29.02.1996")).expect("set");
        }
        let reloaded = BirthdayStore::load(&path).expect("reload");
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("1"), Some(bd("01.01.2000")));
        assert_eq!(reloaded.get("2"), Some(bd("29.02.1996")));
    }

    #[test]
    fn test_corrupt_file_is_store_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("b.json");
        std::fs::write(&path, "{not json").expect("write garbage");
        let err = BirthdayStore::load(&path);
        assert!(matches!(err, Err(Error::Store(_))));
    }

    #[test]
    fn test_store_file_is_plain_string_map() {
        // The on-disk shape must stay readable by older deployments.
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("b.json");
        let mut store = BirthdayStore::load(&path).expect("init");
        store.set("7", bd("07.07.1977")).expect("set");

        let raw = std::fs::read_to_string(&path).expect("read");
        let map: std::collections::HashMap<String, String> =
            serde_json::from_str(&raw).expect("plain map");
        assert_eq!(map.get("7").map(String::as_str), Some("07.07.1977"));
    }
}
