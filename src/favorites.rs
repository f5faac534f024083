// =============================================================================
// Favorites Store — user's saved symbols, persisted as a JSON list
// =============================================================================
//
// The store is owned by the application state and handed to the API layer;
// nothing in the indicator code reads it.  Saves use the same tmp + rename
// pattern as the dashboard config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct FavoritesStore {
    path: PathBuf,
    symbols: Vec<String>,
}

impl FavoritesStore {
    /// An empty store that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            symbols: Vec::new(),
        }
    }

    /// Load from `path`. A missing file is an empty list, not an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "no favorites file, starting empty");
            return Ok(Self::new(path));
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read favorites from {}", path.display()))?;
        let raw: Vec<String> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse favorites from {}", path.display()))?;

        let mut store = Self::new(path);
        for symbol in raw {
            store.insert(&symbol);
        }
        info!(path = %store.path.display(), count = store.symbols.len(), "favorites loaded");
        Ok(store)
    }

    /// Write the list to disk atomically.
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.symbols)
            .context("failed to serialise favorites to JSON")?;
        let tmp_path = self.path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp favorites to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to rename tmp favorites to {}", self.path.display()))?;

        debug!(path = %self.path.display(), count = self.symbols.len(), "favorites saved");
        Ok(())
    }

    /// Add `symbol` (uppercased). Returns `false` if it was already present.
    pub fn add(&mut self, symbol: &str) -> bool {
        self.insert(symbol)
    }

    /// Remove `symbol`. Returns `false` if it was not present.
    pub fn remove(&mut self, symbol: &str) -> bool {
        let symbol = normalize(symbol);
        let before = self.symbols.len();
        self.symbols.retain(|s| *s != symbol);
        self.symbols.len() != before
    }

    pub fn contains(&self, symbol: &str) -> bool {
        let symbol = normalize(symbol);
        self.symbols.iter().any(|s| *s == symbol)
    }

    pub fn list(&self) -> &[String] {
        &self.symbols
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn insert(&mut self, symbol: &str) -> bool {
        let symbol = normalize(symbol);
        if symbol.is_empty() || self.symbols.contains(&symbol) {
            return false;
        }
        self.symbols.push(symbol);
        true
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("trendscope-fav-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("favorites.json")
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = FavoritesStore::load("/definitely/not/here/favorites.json").unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn add_is_idempotent_and_normalised() {
        let mut store = FavoritesStore::new("unused.json");
        assert!(store.add("aapl"));
        assert!(!store.add(" AAPL "));
        assert!(!store.add("  "));
        assert_eq!(store.list(), ["AAPL"]);
        assert!(store.contains("Aapl"));
    }

    #[test]
    fn remove_reports_presence() {
        let mut store = FavoritesStore::new("unused.json");
        store.add("MC.PA");
        assert!(store.remove("mc.pa"));
        assert!(!store.remove("mc.pa"));
        assert!(store.list().is_empty());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let path = temp_path("roundtrip");
        let mut store = FavoritesStore::new(&path);
        store.add("BTC-USD");
        store.add("AAPL");
        store.save().unwrap();

        let loaded = FavoritesStore::load(&path).unwrap();
        assert_eq!(loaded.list(), ["BTC-USD", "AAPL"]);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn load_dedups_legacy_file() {
        let path = temp_path("dedup");
        std::fs::write(&path, r#"["aapl", "AAPL", "msft"]"#).unwrap();
        let loaded = FavoritesStore::load(&path).unwrap();
        assert_eq!(loaded.list(), ["AAPL", "MSFT"]);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "not json").unwrap();
        assert!(FavoritesStore::load(&path).is_err());
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
