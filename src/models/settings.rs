//! Persisted settings: per-account and per-role display configs plus globals

use super::identity::{AccountNumber, RoleKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name and color the user assigned to an account or a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl DisplayConfig {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: Some(color.into()),
            last_updated: None,
        }
    }

    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_updated = Some(at);
        self
    }
}

pub type AccountConfig = DisplayConfig;
pub type RoleConfig = DisplayConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default = "default_enable_watermark")]
    pub enable_watermark: bool,

    #[serde(default = "default_watermark_opacity")]
    pub watermark_opacity: f64,

    #[serde(default = "default_watermark_size")]
    pub watermark_size: u32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            enable_watermark: default_enable_watermark(),
            watermark_opacity: default_watermark_opacity(),
            watermark_size: default_watermark_size(),
        }
    }
}

fn default_enable_watermark() -> bool {
    true
}

fn default_watermark_opacity() -> f64 {
    0.3
}

fn default_watermark_size() -> u32 {
    48
}

/// Partial global settings, merged field by field over the current values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettingsPatch {
    #[serde(default)]
    pub enable_watermark: Option<bool>,

    #[serde(default)]
    pub watermark_opacity: Option<f64>,

    #[serde(default)]
    pub watermark_size: Option<u32>,
}

impl GlobalSettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.enable_watermark.is_none()
            && self.watermark_opacity.is_none()
            && self.watermark_size.is_none()
    }

    pub fn apply_to(&self, settings: &GlobalSettings) -> GlobalSettings {
        GlobalSettings {
            enable_watermark: self.enable_watermark.unwrap_or(settings.enable_watermark),
            watermark_opacity: self.watermark_opacity.unwrap_or(settings.watermark_opacity),
            watermark_size: self.watermark_size.unwrap_or(settings.watermark_size),
        }
    }
}

/// Everything kept in the synced settings store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettings {
    #[serde(default)]
    pub aws_account_settings: BTreeMap<String, AccountConfig>,

    #[serde(default)]
    pub role_settings: BTreeMap<String, RoleConfig>,

    #[serde(default)]
    pub global_settings: GlobalSettings,
}

impl StoredSettings {
    pub fn account_config(&self, account: &AccountNumber) -> Option<&AccountConfig> {
        self.aws_account_settings.get(account.as_str())
    }

    pub fn role_config(&self, key: &RoleKey) -> Option<&RoleConfig> {
        self.role_settings.get(&key.to_string())
    }

    /// Which top-level keys differ between `self` and `other`
    pub fn diff(&self, other: &StoredSettings) -> SettingsChange {
        SettingsChange {
            accounts: self.aws_account_settings != other.aws_account_settings,
            roles: self.role_settings != other.role_settings,
            global: self.global_settings != other.global_settings,
        }
    }
}

/// Top-level store keys as they were actually written. A key missing from
/// the store or from a `saveSettings` payload stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_account_settings: Option<BTreeMap<String, AccountConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_settings: Option<BTreeMap<String, RoleConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_settings: Option<GlobalSettings>,
}

impl StoredSettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.aws_account_settings.is_none() && self.role_settings.is_none() && self.global_settings.is_none()
    }

    /// Overwrite the present keys of `settings`, keeping the others
    pub fn apply_to(&self, settings: &StoredSettings) -> StoredSettings {
        StoredSettings {
            aws_account_settings: self
                .aws_account_settings
                .clone()
                .unwrap_or_else(|| settings.aws_account_settings.clone()),
            role_settings: self
                .role_settings
                .clone()
                .unwrap_or_else(|| settings.role_settings.clone()),
            global_settings: self
                .global_settings
                .clone()
                .unwrap_or_else(|| settings.global_settings.clone()),
        }
    }

    /// Missing keys read as empty maps and default globals
    pub fn into_settings(self) -> StoredSettings {
        StoredSettings {
            aws_account_settings: self.aws_account_settings.unwrap_or_default(),
            role_settings: self.role_settings.unwrap_or_default(),
            global_settings: self.global_settings.unwrap_or_default(),
        }
    }
}

impl From<StoredSettings> for StoredSettingsPatch {
    fn from(settings: StoredSettings) -> Self {
        Self {
            aws_account_settings: Some(settings.aws_account_settings),
            role_settings: Some(settings.role_settings),
            global_settings: Some(settings.global_settings),
        }
    }
}

/// Change notification payload: which store keys were written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsChange {
    #[serde(default)]
    pub accounts: bool,

    #[serde(default)]
    pub roles: bool,

    #[serde(default)]
    pub global: bool,
}

impl SettingsChange {
    pub fn all() -> Self {
        Self {
            accounts: true,
            roles: true,
            global: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.accounts && !self.roles && !self.global
    }
}

/// Downloadable settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub aws_account_settings: BTreeMap<String, AccountConfig>,
    pub role_settings: BTreeMap<String, RoleConfig>,
    pub global_settings: GlobalSettings,
    pub export_date: DateTime<Utc>,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_global_defaults_applied_to_missing_fields() {
        let settings: GlobalSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, GlobalSettings::default());
        assert!(settings.enable_watermark);
        assert_eq!(settings.watermark_opacity, 0.3);
        assert_eq!(settings.watermark_size, 48);
    }

    #[test]
    fn test_legacy_global_keys_are_ignored() {
        let json = r#"{
            "enableWatermark": false,
            "enableHeaderColoring": true,
            "enableFooterColoring": true
        }"#;
        let settings: GlobalSettings = serde_json::from_str(json).unwrap();
        assert!(!settings.enable_watermark);
        assert_eq!(settings.watermark_size, 48);
    }

    #[test]
    fn test_stored_settings_uses_extension_key_names() {
        let json = r##"{
            "awsAccountSettings": {
                "123456789012": { "name": "Prod", "color": "#ff0000", "lastUpdated": "2024-05-01T10:00:00.000Z" }
            },
            "roleSettings": {
                "123456789012:Admin": { "name": "Prod admin", "color": "#00ff00" }
            }
        }"##;
        let settings: StoredSettings = serde_json::from_str(json).unwrap();
        let account = AccountNumber::parse("123456789012").unwrap();
        assert_eq!(settings.account_config(&account).unwrap().name, "Prod");
        let key = RoleKey::new(account, "Admin");
        assert_eq!(settings.role_config(&key).unwrap().name, "Prod admin");
        assert_eq!(settings.global_settings, GlobalSettings::default());
    }

    #[test]
    fn test_patch_only_overrides_present_fields() {
        let patch = GlobalSettingsPatch {
            watermark_size: Some(24),
            ..Default::default()
        };
        let merged = patch.apply_to(&GlobalSettings::default());
        assert_eq!(merged.watermark_size, 24);
        assert!(merged.enable_watermark);
        assert_eq!(merged.watermark_opacity, 0.3);
    }

    #[test]
    fn test_settings_patch_keeps_absent_keys() {
        let mut current = StoredSettings::default();
        current
            .aws_account_settings
            .insert("123456789012".into(), DisplayConfig::new("Prod", "#ff0000"));

        let patch: StoredSettingsPatch =
            serde_json::from_str(r#"{"globalSettings": {"enableWatermark": false}}"#).unwrap();
        assert!(patch.aws_account_settings.is_none());

        let merged = patch.apply_to(&current);
        assert_eq!(merged.aws_account_settings, current.aws_account_settings);
        assert!(!merged.global_settings.enable_watermark);
        assert_eq!(merged.global_settings.watermark_size, 48);
    }

    #[test]
    fn test_diff_reports_changed_keys() {
        let before = StoredSettings::default();
        let mut after = before.clone();
        after
            .aws_account_settings
            .insert("123456789012".into(), DisplayConfig::new("Prod", "#ff0000"));

        let change = before.diff(&after);
        assert!(change.accounts);
        assert!(!change.roles);
        assert!(!change.global);
        assert!(before.diff(&before).is_empty());
    }
}
