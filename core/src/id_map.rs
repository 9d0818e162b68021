//! File-backed cache mapping external ids to OZmap ids.
//!
//! Integrations that mirror another system into OZmap keep a
//! `namespace -> external id -> OZmap id` table between runs. `IdMap` is an
//! explicit value: load it, pass it to whatever needs it, flush it when done.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMap {
    path: PathBuf,
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl IdMap {
    /// Load the cache at `path`, creating it with `{}` when missing.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            log::debug!("[ID_MAP] Creating empty id map at {}", path.display());
            fs::write(&path, "{}")?;
        }
        let raw = fs::read_to_string(&path)?;
        let entries = if raw.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&raw)?
        };
        Ok(Self { path, entries })
    }

    /// Load the cache at `config.id_map_path` (`ID_MAP_PATH`).
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::load(&config.id_map_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, namespace: &str, external_id: &str) -> Option<&str> {
        self.entries
            .get(namespace)
            .and_then(|ids| ids.get(external_id))
            .map(String::as_str)
    }

    /// Record a mapping, returning the OZmap id it replaced.
    pub fn insert(
        &mut self,
        namespace: impl Into<String>,
        external_id: impl Into<String>,
        ozmap_id: impl Into<String>,
    ) -> Option<String> {
        self.entries
            .entry(namespace.into())
            .or_default()
            .insert(external_id.into(), ozmap_id.into())
    }

    pub fn remove(&mut self, namespace: &str, external_id: &str) -> Option<String> {
        let ids = self.entries.get_mut(namespace)?;
        let removed = ids.remove(external_id);
        if ids.is_empty() {
            self.entries.remove(namespace);
        }
        removed
    }

    /// External id mapped to `ozmap_id` within `namespace`.
    pub fn reverse_lookup(&self, namespace: &str, ozmap_id: &str) -> Option<&str> {
        self.entries
            .get(namespace)?
            .iter()
            .find(|(_, id)| id.as_str() == ozmap_id)
            .map(|(external, _)| external.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the cache back to its file as pretty-printed JSON.
    pub fn flush(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        log::debug!("[ID_MAP] Flushed {} ids to {}", self.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_map.json");
        let map = IdMap::load(&path).unwrap();
        assert!(map.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn flush_then_load_restores_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.json");

        let mut map = IdMap::load(&path).unwrap();
        assert_eq!(map.insert("box", "1001", "5f1a"), None);
        map.insert("box", "1002", "5f1b");
        map.insert("client", "77", "60aa");
        map.flush().unwrap();

        let loaded = IdMap::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get("box", "1002"), Some("5f1b"));
        assert_eq!(loaded.get("client", "77"), Some("60aa"));
        assert_eq!(loaded.get("client", "78"), None);
    }

    #[test]
    fn reverse_lookup_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = IdMap::load(dir.path().join("ids.json")).unwrap();
        map.insert("box", "1001", "5f1a");

        assert_eq!(map.reverse_lookup("box", "5f1a"), Some("1001"));
        assert_eq!(map.reverse_lookup("client", "5f1a"), None);
        assert_eq!(map.insert("box", "1001", "5f1c"), Some("5f1a".to_string()));
        assert_eq!(map.remove("box", "1001"), Some("5f1c".to_string()));
        assert!(map.is_empty());
    }

    #[test]
    fn from_config_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.json");
        fs::write(&path, r#"{"box": {"1001": "5f1a"}}"#).unwrap();

        let config = Config::default().with_id_map_path(&path);
        let map = IdMap::from_config(&config).unwrap();
        assert_eq!(map.path(), path.as_path());
        assert_eq!(map.get("box", "1001"), Some("5f1a"));
    }

    #[test]
    fn malformed_file_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.json");
        fs::write(&path, "[1, 2").unwrap();
        let err = IdMap::load(&path).unwrap_err();
        assert!(matches!(err, crate::Error::Json(_)));
    }
}
