//! Saved connection profiles
//!
//! Profiles for attachable databases are kept in
//! `~/.quackview/connections.json`.

use crate::error::{QuackviewError, Result};
use quackview_engine::ConnectionProfile;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Connection profiles keyed by name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStore {
    #[serde(default)]
    profiles: Vec<ConnectionProfile>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl ProfileStore {
    /// Returns the default store path: `~/.quackview/connections.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".quackview").join("connections.json"))
    }

    /// Load from the default location.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(path),
            None => Self::default(),
        }
    }

    /// Load from `path`; a missing or unreadable file yields an empty store
    /// that will be saved to `path`.
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut store: ProfileStore = fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();
        store.path = Some(path);
        store
    }

    /// Write the store back to where it was loaded from.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        save_json(path, self)
    }

    pub fn list(&self) -> &[ConnectionProfile] {
        &self.profiles
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Add a profile, replacing one with the same name.
    pub fn upsert(&mut self, profile: ConnectionProfile) -> Result<()> {
        if profile.name.trim().is_empty() {
            return Err(QuackviewError::Config(
                "connection name must not be empty".to_string(),
            ));
        }
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
        Ok(())
    }

    /// Remove a profile by name. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.name != name);
        self.profiles.len() != before
    }
}

fn save_json(path: &Path, store: &ProfileStore) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(store)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quackview_engine::RemoteKind;
    use tempfile::TempDir;

    #[test]
    fn test_upsert_replace_and_remove() {
        let mut store = ProfileStore::default();
        store
            .upsert(ConnectionProfile::new("shop", RemoteKind::MySql))
            .unwrap();
        let mut updated = ConnectionProfile::new("shop", RemoteKind::MySql);
        updated.host = "db.internal".into();
        store.upsert(updated).unwrap();

        assert_eq!(store.list().len(), 1);
        assert_eq!(store.get("shop").unwrap().host, "db.internal");
        assert!(store.remove("shop"));
        assert!(!store.remove("shop"));
        assert!(store
            .upsert(ConnectionProfile::new(" ", RemoteKind::Sqlite))
            .is_err());
    }

    #[test]
    fn test_persisted_to_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("connections.json");

        let mut store = ProfileStore::load_from(&path);
        assert!(store.list().is_empty());
        let mut profile = ConnectionProfile::new("wh", RemoteKind::Postgres);
        profile.database = "analytics".into();
        store.upsert(profile.clone()).unwrap();
        store.save().unwrap();

        let reloaded = ProfileStore::load_from(&path);
        assert_eq!(reloaded.list(), &[profile]);
    }
}
