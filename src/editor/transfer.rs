//! Settings export and import files

use crate::error::{IndicatorError, Result};
use crate::models::{
    AccountConfig, ExportDocument, GlobalSettingsPatch, RoleConfig, StoredSettings,
};
use crate::utils::export_file_name;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

pub const EXPORT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How much an import brought in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub accounts: usize,
    pub roles: usize,
}

pub fn export_document(settings: &StoredSettings, now: DateTime<Utc>) -> ExportDocument {
    ExportDocument {
        aws_account_settings: settings.aws_account_settings.clone(),
        role_settings: settings.role_settings.clone(),
        global_settings: settings.global_settings.clone(),
        export_date: now,
        version: EXPORT_VERSION.to_string(),
    }
}

/// File name and pretty-printed contents of an export taken at `now`
pub fn export_settings(settings: &StoredSettings, now: DateTime<Utc>) -> Result<(String, String)> {
    let document = export_document(settings, now);
    let json = serde_json::to_string_pretty(&document)?;
    Ok((export_file_name(now.date_naive()), json))
}

/// Build the settings an import would produce, without touching `current`.
///
/// `awsAccountSettings` must be present as an object. Accounts and roles are
/// replaced wholesale; `globalSettings` fields are merged over the current
/// values. Anything malformed rejects the whole file.
pub fn apply_import(json: &str, current: &StoredSettings) -> Result<(StoredSettings, ImportSummary)> {
    let data: Value = serde_json::from_str(json)
        .map_err(|e| IndicatorError::ImportFormat(format!("not valid JSON: {e}")))?;

    let accounts = match data.get("awsAccountSettings") {
        Some(value @ Value::Object(_)) => section::<BTreeMap<String, AccountConfig>>(value, "awsAccountSettings")?,
        Some(_) => {
            return Err(IndicatorError::ImportFormat(
                "awsAccountSettings must be an object".into(),
            ))
        }
        None => {
            return Err(IndicatorError::ImportFormat(
                "missing awsAccountSettings".into(),
            ))
        }
    };

    let roles = match data.get("roleSettings") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(value) => section::<BTreeMap<String, RoleConfig>>(value, "roleSettings")?,
    };

    let patch = match data.get("globalSettings") {
        None | Some(Value::Null) => GlobalSettingsPatch::default(),
        Some(value) => section::<GlobalSettingsPatch>(value, "globalSettings")?,
    };

    let summary = ImportSummary {
        accounts: accounts.len(),
        roles: roles.len(),
    };
    let imported = StoredSettings {
        aws_account_settings: accounts,
        role_settings: roles,
        global_settings: patch.apply_to(&current.global_settings),
    };
    Ok((imported, summary))
}

fn section<T: serde::de::DeserializeOwned>(value: &Value, name: &str) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| IndicatorError::ImportFormat(format!("invalid {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DisplayConfig, GlobalSettings};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_export_shape() {
        let mut settings = StoredSettings::default();
        settings
            .aws_account_settings
            .insert("123456789012".into(), DisplayConfig::new("Prod", "#ff0000"));

        let (name, json) = export_settings(&settings, now()).unwrap();
        assert_eq!(name, "aws-account-indicator-settings-2024-06-01.json");

        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], EXPORT_VERSION);
        assert_eq!(value["exportDate"], "2024-06-01T12:30:00Z");
        assert_eq!(value["awsAccountSettings"]["123456789012"]["name"], "Prod");
        assert!(value["roleSettings"].is_object());
        assert_eq!(value["globalSettings"]["watermarkSize"], 48);
    }

    #[test]
    fn test_import_merges_globals_and_replaces_maps() {
        let mut current = StoredSettings::default();
        current
            .aws_account_settings
            .insert("999999999999".into(), DisplayConfig::new("Old", "#000000"));
        current.global_settings = GlobalSettings {
            enable_watermark: false,
            watermark_opacity: 0.5,
            watermark_size: 30,
        };

        let json = r##"{
            "awsAccountSettings": { "123456789012": { "name": "Prod", "color": "#ff0000" } },
            "globalSettings": { "watermarkSize": 64 }
        }"##;
        let (imported, summary) = apply_import(json, &current).unwrap();

        assert_eq!(summary, ImportSummary { accounts: 1, roles: 0 });
        assert!(!imported.aws_account_settings.contains_key("999999999999"));
        assert!(imported.role_settings.is_empty());
        assert_eq!(
            imported.global_settings,
            GlobalSettings {
                enable_watermark: false,
                watermark_opacity: 0.5,
                watermark_size: 64,
            }
        );
    }

    #[test]
    fn test_import_accepts_empty_accounts_object() {
        let (imported, summary) = apply_import(r#"{"awsAccountSettings": {}}"#, &StoredSettings::default()).unwrap();
        assert_eq!(summary.accounts, 0);
        assert!(imported.aws_account_settings.is_empty());
    }

    #[test]
    fn test_import_rejections() {
        let current = StoredSettings::default();
        for json in [
            "not json",
            r#"{"roleSettings": {}}"#,
            r#"{"awsAccountSettings": []}"#,
            r#"{"awsAccountSettings": {}, "roleSettings": 5}"#,
            r#"{"awsAccountSettings": {"1": {"name": 7}}}"#,
        ] {
            assert!(
                matches!(apply_import(json, &current), Err(IndicatorError::ImportFormat(_))),
                "accepted {json}"
            );
        }
    }
}
