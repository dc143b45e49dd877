//! Settings editing against the JSON file store

use aws_account_indicator::editor::EXPORT_VERSION;
use aws_account_indicator::models::{GlobalSettingsPatch, RoleKey};
use aws_account_indicator::store::JsonFileSettingsStore;
use aws_account_indicator::{IndicatorError, SettingsEditor, SettingsStore};
use chrono::{TimeZone, Utc};
use futures::executor::block_on;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn editor(dir: &TempDir, name: &str) -> SettingsEditor<JsonFileSettingsStore> {
    block_on(SettingsEditor::open(JsonFileSettingsStore::new(dir.path().join(name))))
}

#[test]
fn test_edits_persist_across_sessions() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now();

    {
        let mut editor = editor(&dir, "settings.json");
        block_on(editor.save_account("1234 5678 9012", "Production", "#ff3b30", now)).unwrap();
        block_on(editor.save_role("1234-5678-9012", "Admin", "", "#34c759", now)).unwrap();
        block_on(editor.update_global(&GlobalSettingsPatch {
            watermark_opacity: Some(0.5),
            ..Default::default()
        }))
        .unwrap();
    }

    let reopened = editor(&dir, "settings.json");
    let settings = reopened.settings();
    assert_eq!(settings.aws_account_settings["123456789012"].name, "Production");
    assert_eq!(settings.role_settings["123456789012:Admin"].name, "Admin");
    assert_eq!(settings.global_settings.watermark_opacity, 0.5);
    assert!(settings.global_settings.enable_watermark);
}

#[test]
fn test_missing_file_opens_with_defaults() {
    let dir = TempDir::new().unwrap();
    let editor = editor(&dir, "nested/settings.json");
    assert!(editor.settings().aws_account_settings.is_empty());
    assert_eq!(editor.settings().global_settings.watermark_size, 48);
}

#[test]
fn test_rejected_input_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let mut editor = editor(&dir, "settings.json");

    let err = block_on(editor.save_account("12345", "Short", "#ffffff", Utc::now())).unwrap_err();
    assert!(matches!(err, IndicatorError::Validation(_)));
    assert!(!dir.path().join("settings.json").exists());
}

#[test]
fn test_export_then_import_into_another_store() {
    let dir = TempDir::new().unwrap();
    let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();

    let mut source = editor(&dir, "source.json");
    block_on(source.save_account("111111111111", "Dev", "#007aff", now)).unwrap();
    block_on(source.save_account("222222222222", "Prod", "#ff3b30", now)).unwrap();
    block_on(source.save_role("111111111111", "ReadOnly", "Dev read", "#8e8e93", now)).unwrap();

    let (file_name, json) = source.export(now).unwrap();
    assert_eq!(file_name, "aws-account-indicator-settings-2026-03-02.json");
    let exported: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(exported["version"], EXPORT_VERSION);

    let export_path = dir.path().join(&file_name);
    fs::write(&export_path, &json).unwrap();

    let mut target = editor(&dir, "target.json");
    block_on(target.save_account("333333333333", "Old", "#000000", now)).unwrap();
    let summary = block_on(target.import(&fs::read_to_string(&export_path).unwrap())).unwrap();
    assert_eq!((summary.accounts, summary.roles), (2, 1));

    // Import replaces accounts wholesale
    let stored = block_on(target.store().load()).unwrap();
    assert_eq!(stored.aws_account_settings, source.settings().aws_account_settings);
    assert_eq!(stored.role_settings, source.settings().role_settings);
    assert!(!stored.aws_account_settings.contains_key("333333333333"));
}

#[test]
fn test_bad_import_keeps_current_settings() {
    let dir = TempDir::new().unwrap();
    let mut editor = editor(&dir, "settings.json");
    block_on(editor.save_account("111111111111", "Dev", "#007aff", Utc::now())).unwrap();

    let err = block_on(editor.import(r#"{"roleSettings": {}}"#)).unwrap_err();
    assert!(matches!(err, IndicatorError::ImportFormat(_)));

    let stored = block_on(editor.store().load()).unwrap();
    assert_eq!(stored.aws_account_settings.len(), 1);
}

#[test]
fn test_delete_and_clear() {
    let dir = TempDir::new().unwrap();
    let mut editor = editor(&dir, "settings.json");
    let now = Utc::now();
    block_on(editor.save_account("111111111111", "Dev", "#007aff", now)).unwrap();
    let key: RoleKey = block_on(editor.save_role("111111111111", "Ops", "", "#007aff", now)).unwrap();

    assert!(block_on(editor.delete_role(&key)).unwrap());
    assert!(!block_on(editor.delete_role(&key)).unwrap());
    assert!(block_on(editor.delete_account("1111-1111-1111")).unwrap());

    block_on(editor.clear()).unwrap();
    assert!(!dir.path().join("settings.json").exists());
}
