//! JSON file backed settings store used by the CLI

use super::SettingsStore;
use crate::error::Result;
use crate::models::{StoredSettings, StoredSettingsPatch};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings kept as one pretty-printed JSON document. A missing file reads
/// as empty settings with default globals.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<StoredSettings> {
        Ok(self.read_keys()?.into_settings())
    }

    pub fn read_keys(&self) -> Result<StoredSettingsPatch> {
        if !self.path.exists() {
            return Ok(StoredSettingsPatch::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn write(&self, settings: &StoredSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        tracing::debug!(path = %self.path.display(), "settings written");
        Ok(())
    }
}

impl SettingsStore for JsonFileSettingsStore {
    async fn load_keys(&self) -> Result<StoredSettingsPatch> {
        self.read_keys()
    }

    async fn save(&self, settings: &StoredSettings) -> Result<()> {
        self.write(settings)
    }

    async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DisplayConfig;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_reads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSettingsStore::new(dir.path().join("settings.json"));
        assert_eq!(block_on(store.load()).unwrap(), StoredSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSettingsStore::new(dir.path().join("nested").join("settings.json"));

        let mut settings = StoredSettings::default();
        settings
            .aws_account_settings
            .insert("123456789012".into(), DisplayConfig::new("Prod", "#ff0000"));
        block_on(store.save(&settings)).unwrap();

        assert_eq!(block_on(store.load()).unwrap(), settings);
        block_on(store.clear()).unwrap();
        assert!(!store.path().exists());
    }
}
