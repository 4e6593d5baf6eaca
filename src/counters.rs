//! Durable acquisition counters.
//!
//! One JSON file maps airframe type to the number of units acquired so far.
//! The file is loaded once at startup and overwritten after every confirmed
//! purchase, so a crashed session never loses track of progress. Counts only
//! ever go up; the file being absent means nothing has been acquired yet.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Durable `airframe type → acquired count` store.
#[derive(Debug)]
pub struct CounterStore {
    path: PathBuf,
    counts: HashMap<String, u32>,
}

impl CounterStore {
    /// Load the store from disk; an absent file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let counts = if path.exists() {
            let data = fs::read_to_string(path)
                .with_context(|| format!("failed to read counter file {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("counter file {} is not valid JSON", path.display()))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            counts,
        })
    }

    /// Acquired count for an airframe type (0 when never purchased).
    pub fn count(&self, airframe: &str) -> u32 {
        self.counts.get(airframe).copied().unwrap_or(0)
    }

    /// Record one confirmed purchase and persist immediately. The write is
    /// synchronous and per-purchase; a restart sees every prior purchase.
    pub fn record_purchase(&mut self, airframe: &str) -> Result<u32> {
        let entry = self.counts.entry(airframe.to_string()).or_insert(0);
        *entry += 1;
        let new_count = *entry;
        self.persist()?;
        Ok(new_count)
    }

    /// Overwrite the backing file with the current counts.
    ///
    /// Writes to a sibling temp file and renames it into place so a crash
    /// mid-write never leaves a torn file behind.
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create counter dir {}", parent.display())
            })?;
        }
        let data = serde_json::to_string_pretty(&self.counts)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data)
            .with_context(|| format!("failed to write counter file {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace counter file {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn absent_file_is_an_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = CounterStore::load(&dir.path().join("counters.json")).unwrap();
        assert_eq!(store.count("Dash-8 Q400"), 0);
    }

    #[test]
    fn counts_survive_a_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counters.json");

        let mut store = CounterStore::load(&path).unwrap();
        for _ in 0..3 {
            store.record_purchase("Dash-8 Q400").unwrap();
        }
        store.record_purchase("ATR 72-600").unwrap();
        drop(store);

        let reloaded = CounterStore::load(&path).unwrap();
        assert_eq!(reloaded.count("Dash-8 Q400"), 3);
        assert_eq!(reloaded.count("ATR 72-600"), 1);
        assert_eq!(reloaded.count("A380"), 0);
    }

    #[test]
    fn each_purchase_is_persisted_not_batched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counters.json");

        let mut store = CounterStore::load(&path).unwrap();
        store.record_purchase("ATR 72-600").unwrap();
        // A concurrent load (a restarted process) already sees the count.
        let parallel = CounterStore::load(&path).unwrap();
        assert_eq!(parallel.count("ATR 72-600"), 1);

        store.record_purchase("ATR 72-600").unwrap();
        assert_eq!(CounterStore::load(&path).unwrap().count("ATR 72-600"), 2);
    }

    #[test]
    fn increments_return_the_new_count() {
        let dir = TempDir::new().unwrap();
        let mut store = CounterStore::load(&dir.path().join("c.json")).unwrap();
        assert_eq!(store.record_purchase("x").unwrap(), 1);
        assert_eq!(store.record_purchase("x").unwrap(), 2);
    }
}
