use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};
use serde::Serialize;

use crate::Result;
use crate::prompt::{Model, SummaryLength, is_known_language};

pub const API_KEY_STORAGE_KEY: &str = "googleAIStudioApiKey";
pub const PREFERENCES_STORAGE_KEY: &str = "yt-summary-preferences";

/// Persistent string key/value storage
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// A JSON object on disk, rewritten on every change
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

pub fn default_storage_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytgist")
        .join("storage.json")
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        debug!("Wrote storage: {}", self.path.display());
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }
}

/// The stored Google AI Studio key
pub struct ApiKeyStore;

impl ApiKeyStore {
    pub fn load(storage: &dyn Storage) -> Option<String> {
        match storage.get(API_KEY_STORAGE_KEY) {
            Ok(key) => key.filter(|k| !k.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read stored API key: {e}");
                None
            }
        }
    }

    /// Saving an empty key removes it.
    pub fn save(storage: &dyn Storage, api_key: &str) -> Result<()> {
        if api_key.is_empty() {
            storage.remove(API_KEY_STORAGE_KEY)
        } else {
            storage.set(API_KEY_STORAGE_KEY, api_key)
        }
    }

    pub fn remove(storage: &dyn Storage) -> Result<()> {
        storage.remove(API_KEY_STORAGE_KEY)
    }
}

/// Language, model and length picked by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub language: String,
    pub model: Model,
    pub length: SummaryLength,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            model: Model::default(),
            length: SummaryLength::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StoredPreferences<'a> {
    language: &'a str,
    model: &'a str,
    length: &'a str,
}

impl Preferences {
    /// Overlay stored values onto `defaults`. Each field is checked on its
    /// own, so a field that is not a string naming a known option leaves the
    /// other fields intact.
    pub fn load(storage: &dyn Storage, defaults: Preferences) -> Preferences {
        let stored = match storage.get(PREFERENCES_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!("Failed to load picker preferences: {e}");
                    return defaults;
                }
            },
            Ok(None) => return defaults,
            Err(e) => {
                warn!("Failed to load picker preferences: {e}");
                return defaults;
            }
        };

        let field = |name: &str| stored.get(name).and_then(|v| v.as_str());

        let mut prefs = defaults;
        if let Some(language) = field("language").filter(|l| is_known_language(l)) {
            prefs.language = language.to_string();
        }
        if let Some(model) = field("model").and_then(|m| m.parse().ok()) {
            prefs.model = model;
        }
        if let Some(length) = field("length").and_then(|l| l.parse().ok()) {
            prefs.length = length;
        }
        prefs
    }

    pub fn save(&self, storage: &dyn Storage) -> Result<()> {
        let payload = StoredPreferences {
            language: &self.language,
            model: self.model.value(),
            length: self.length.value(),
        };
        storage.set(PREFERENCES_STORAGE_KEY, &serde_json::to_string(&payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        let storage = FileStorage::new(&path);
        assert_eq!(storage.get("k").unwrap(), None);

        storage.set("k", "v").unwrap();
        storage.set("other", "x").unwrap();
        assert_eq!(FileStorage::new(&path).get("k").unwrap().as_deref(), Some("v"));

        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
        assert_eq!(storage.get("other").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_file_storage_corrupt_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(FileStorage::new(&path).get("k").is_err());
    }

    #[test]
    fn test_api_key_store() {
        let storage = MemoryStorage::default();
        assert_eq!(ApiKeyStore::load(&storage), None);

        ApiKeyStore::save(&storage, "AIza-key").unwrap();
        assert_eq!(ApiKeyStore::load(&storage).as_deref(), Some("AIza-key"));

        ApiKeyStore::save(&storage, "").unwrap();
        assert_eq!(ApiKeyStore::load(&storage), None);

        ApiKeyStore::save(&storage, "again").unwrap();
        ApiKeyStore::remove(&storage).unwrap();
        assert_eq!(ApiKeyStore::load(&storage), None);
    }

    #[test]
    fn test_preferences_roundtrip() {
        let storage = MemoryStorage::default();
        let prefs = Preferences {
            language: "ja".to_string(),
            model: Model::Gemini20Flash,
            length: SummaryLength::Long,
        };
        prefs.save(&storage).unwrap();
        assert_eq!(Preferences::load(&storage, Preferences::default()), prefs);
    }

    #[test]
    fn test_preferences_ignore_unknown_values() {
        let storage = MemoryStorage::default();
        storage
            .set(
                PREFERENCES_STORAGE_KEY,
                r#"{"language":"klingon","model":"gemini-2.5-pro","length":"epic"}"#,
            )
            .unwrap();
        let prefs = Preferences::load(&storage, Preferences::default());
        assert_eq!(prefs.language, "en");
        assert_eq!(prefs.model, Model::Gemini25Pro);
        assert_eq!(prefs.length, SummaryLength::Medium);
    }

    #[test]
    fn test_preferences_keep_valid_fields_beside_mistyped_ones() {
        let storage = MemoryStorage::default();
        storage
            .set(PREFERENCES_STORAGE_KEY, r#"{"language":"ja","model":5,"length":"long"}"#)
            .unwrap();
        let prefs = Preferences::load(&storage, Preferences::default());
        assert_eq!(prefs.language, "ja");
        assert_eq!(prefs.model, Model::default());
        assert_eq!(prefs.length, SummaryLength::Long);
    }

    #[test]
    fn test_preferences_malformed_json_keeps_defaults() {
        let storage = MemoryStorage::default();
        storage.set(PREFERENCES_STORAGE_KEY, "[1,2,3]").unwrap();
        assert_eq!(Preferences::load(&storage, Preferences::default()), Preferences::default());
    }
}
