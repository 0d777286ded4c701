use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::FrontendError;

/// Persistent key/value store for front-end preferences
pub trait SettingsStore {
    fn read_setting(&self, key: &str) -> Option<Value>;

    fn write_setting(&mut self, key: &str, value: Value) -> Result<(), FrontendError>;
}

/// Settings kept as a JSON object in a file next to the wallet
pub struct JsonSettingsStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonSettingsStore {
    pub fn open(path: &Path) -> Result<Self, FrontendError> {
        let values = if path.exists() {
            let text = fs::read_to_string(path)?;
            match serde_json::from_str::<Value>(&text)? {
                Value::Object(map) => map,
                _ => {
                    return Err(FrontendError::SettingsError(format!(
                        "{} does not hold a JSON object",
                        path.display()
                    )))
                }
            }
        } else {
            log::info!("No settings at {}, starting from defaults", path.display());
            Map::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), FrontendError> {
        let text = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn read_setting(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn write_setting(&mut self, key: &str, value: Value) -> Result<(), FrontendError> {
        log::debug!("Writing setting {} = {}", key, value);
        self.values.insert(key.to_string(), value);
        self.flush()
    }
}

#[derive(Default)]
pub struct MemorySettingsStore {
    values: BTreeMap<String, Value>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn read_setting(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn write_setting(&mut self, key: &str, value: Value) -> Result<(), FrontendError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut store = JsonSettingsStore::open(&path).unwrap();
        assert!(store.read_setting("display_unit").is_none());
        store.write_setting("display_unit", json!(1)).unwrap();
        store.write_setting("proxy", json!("127.0.0.1:9050")).unwrap();

        let reopened = JsonSettingsStore::open(&path).unwrap();
        assert_eq!(reopened.read_setting("display_unit"), Some(json!(1)));
        assert_eq!(reopened.read_setting("proxy"), Some(json!("127.0.0.1:9050")));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn json_store_rejects_non_object_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(matches!(
            JsonSettingsStore::open(&path),
            Err(FrontendError::SettingsError(_))
        ));
    }
}
