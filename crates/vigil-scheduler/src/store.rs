//! Durable destination store — one JSON file, human-readable.
//!
//! Writes are atomic: serialize to `<file>.tmp`, then rename over the live
//! file, so a crash mid-write never leaves a half-written store behind. A
//! record that fails to decode disables only that destination: it is kept
//! aside as raw JSON and written back verbatim on every save, so a hand
//! edit can revive it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use vigil_core::error::{Result, VigilError};

use crate::destination::Destination;

pub struct ScheduleStore {
    path: PathBuf,
    destinations: BTreeMap<String, Destination>,
    /// Records that failed to decode on load, keyed by id, raw.
    quarantined: BTreeMap<String, serde_json::Value>,
}

impl ScheduleStore {
    /// Open the store, loading any existing file.
    pub fn open(path: &Path) -> Result<Self> {
        let mut store = Self {
            path: path.to_path_buf(),
            destinations: BTreeMap::new(),
            quarantined: BTreeMap::new(),
        };
        store.load()?;
        Ok(store)
    }

    fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| VigilError::Store(format!("read {}: {e}", self.path.display())))?;
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&content)
            .map_err(|e| VigilError::Store(format!("decode {}: {e}", self.path.display())))?;

        for (id, value) in raw {
            match serde_json::from_value::<Destination>(value.clone()) {
                Ok(dest) if dest.id == id => {
                    self.destinations.insert(id, dest);
                }
                Ok(dest) => {
                    warn!("⚠️ Record '{id}' carries id '{}' — quarantined", dest.id);
                    self.quarantined.insert(id, value);
                }
                Err(e) => {
                    warn!("⚠️ Record '{id}' is corrupt and treated as disabled: {e}");
                    self.quarantined.insert(id, value);
                }
            }
        }
        debug!(
            "💾 Loaded {} destinations ({} quarantined) from {}",
            self.destinations.len(),
            self.quarantined.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Persist the current state atomically.
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VigilError::Store(format!("mkdir: {e}")))?;
        }
        let mut raw: BTreeMap<&str, serde_json::Value> = BTreeMap::new();
        for (id, dest) in &self.destinations {
            let value = serde_json::to_value(dest)
                .map_err(|e| VigilError::Store(format!("encode '{id}': {e}")))?;
            raw.insert(id, value);
        }
        for (id, value) in &self.quarantined {
            raw.insert(id, value.clone());
        }
        let json = serde_json::to_string_pretty(&raw)
            .map_err(|e| VigilError::Store(format!("encode: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)
            .map_err(|e| VigilError::Store(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| VigilError::Store(format!("rename {}: {e}", self.path.display())))?;
        debug!(
            "💾 Saved {} destinations to {}",
            raw.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Destination> {
        self.destinations.get(id)
    }

    /// All destinations, sorted by id.
    pub fn list(&self) -> Vec<Destination> {
        self.destinations.values().cloned().collect()
    }

    /// Ids of records that failed to decode on load.
    pub fn quarantined_ids(&self) -> Vec<String> {
        self.quarantined.keys().cloned().collect()
    }

    /// Insert or replace a destination. Replacing a quarantined record
    /// counts as correcting it.
    pub fn upsert(&mut self, destination: Destination) -> Result<()> {
        self.quarantined.remove(&destination.id);
        self.destinations
            .insert(destination.id.clone(), destination);
        self.save()
    }

    /// Remove a destination. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let existed =
            self.destinations.remove(id).is_some() | self.quarantined.remove(id).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    /// Flip the enabled flag. Returns whether the destination exists.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<bool> {
        match self.destinations.get_mut(id) {
            Some(dest) => {
                dest.enabled = enabled;
                self.save()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Record a successful delivery. The only path that moves
    /// `last_notified`, and it never moves it backwards.
    pub fn mark_notified(&mut self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let dest = self
            .destinations
            .get_mut(id)
            .ok_or_else(|| VigilError::Store(format!("unknown destination '{id}'")))?;
        if dest.last_notified.is_some_and(|prev| prev > at) {
            return Ok(());
        }
        dest.last_notified = Some(at);
        self.save()
    }
}
