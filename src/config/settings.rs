//! Process-wide key/value settings persisted as a JSON object file.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::info;

use crate::database::{StoreError, StoreResult};

/// Settings that are not tied to any guild.
///
/// Reads go to disk so edits made while the process runs are picked up.
pub struct JsonSettings {
    path: PathBuf,
    settings: Mutex<Map<String, Value>>,
}

impl JsonSettings {
    /// Load `path`, creating it with `defaults` if it does not exist.
    pub async fn open(path: impl Into<PathBuf>, defaults: Map<String, Value>) -> StoreResult<Self> {
        let path = path.into();

        let settings = if tokio::fs::try_exists(&path).await? {
            read_object(&path).await?
        } else {
            write_object(&path, &defaults).await?;
            info!("Created settings file {}", path.display());
            defaults
        };

        Ok(Self {
            path,
            settings: Mutex::new(settings),
        })
    }

    /// Defaults for a freshly created settings file.
    pub fn default_values() -> Map<String, Value> {
        let mut defaults = Map::new();
        defaults.insert("some_key".to_string(), Value::String("some_value".to_string()));
        defaults
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut settings = self.settings.lock().await;
        *settings = read_object(&self.path).await?;
        Ok(settings.get(key).cloned())
    }

    /// Set a value and write the whole file back.
    pub async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let mut settings = self.settings.lock().await;
        settings.insert(key.to_string(), value);
        write_object(&self.path, &settings).await
    }
}

async fn read_object(path: &Path) -> StoreResult<Map<String, Value>> {
    let contents = tokio::fs::read_to_string(path).await?;
    match serde_json::from_str::<Value>(&contents)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::Serialization(format!(
            "{} does not hold a JSON object",
            path.display()
        ))),
    }
}

async fn write_object(path: &Path, settings: &Map<String, Value>) -> StoreResult<()> {
    let contents = serde_json::to_string_pretty(settings)?;
    // Write then rename; readers never see a partial file.
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_creates_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom_config.json");

        let settings = JsonSettings::open(&path, JsonSettings::default_values()).await.unwrap();
        assert!(path.exists());
        assert_eq!(settings.get("some_key").await.unwrap(), Some(json!("some_value")));
        assert_eq!(settings.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom_config.json");

        let settings = JsonSettings::open(&path, Map::new()).await.unwrap();
        settings.set("prefix", json!("!")).await.unwrap();

        let reopened = JsonSettings::open(&path, JsonSettings::default_values()).await.unwrap();
        assert_eq!(reopened.get("prefix").await.unwrap(), Some(json!("!")));
        assert_eq!(reopened.get("some_key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_non_object_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom_config.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let result = JsonSettings::open(&path, Map::new()).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
