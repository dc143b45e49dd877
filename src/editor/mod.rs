//! Settings editor: validated CRUD over the settings store
//!
//! Every mutation is validated first and written through to the store; the
//! in-memory copy only changes once the write succeeded.

pub mod transfer;
pub mod validation;

use crate::error::Result;
use crate::models::{
    AccountConfig, AccountNumber, DisplayConfig, GlobalSettings, GlobalSettingsPatch, RoleKey,
    StoredSettings,
};
use crate::store::SettingsStore;
use chrono::{DateTime, Utc};

pub use transfer::{apply_import, export_settings, ImportSummary, EXPORT_VERSION};
pub use validation::{
    validate_account_number, validate_color, validate_display_name, validate_global,
    validate_role_name,
};

pub struct SettingsEditor<St> {
    store: St,
    settings: StoredSettings,
}

impl<St: SettingsStore> SettingsEditor<St> {
    /// Load current settings. An unreadable store starts from defaults.
    pub async fn open(store: St) -> Self {
        let settings = match store.load().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load settings, starting from defaults");
                StoredSettings::default()
            }
        };
        Self { store, settings }
    }

    pub fn settings(&self) -> &StoredSettings {
        &self.settings
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    async fn commit(&mut self, next: StoredSettings) -> Result<()> {
        self.store.save(&next).await?;
        self.settings = next;
        Ok(())
    }

    pub async fn save_account(
        &mut self,
        number: &str,
        name: &str,
        color: &str,
        now: DateTime<Utc>,
    ) -> Result<AccountNumber> {
        let account = validate_account_number(number)?;
        let name = validate_display_name(name)?;
        let color = validate_color(color)?;

        let mut next = self.settings.clone();
        next.aws_account_settings.insert(
            account.to_string(),
            DisplayConfig::new(name, color).updated_at(now),
        );
        self.commit(next).await?;
        tracing::debug!(%account, "account saved");
        Ok(account)
    }

    /// Store a role config under `<account>:<role>`. The shown name defaults
    /// to the role name.
    pub async fn save_role(
        &mut self,
        account: &str,
        role_name: &str,
        display_name: &str,
        color: &str,
        now: DateTime<Utc>,
    ) -> Result<RoleKey> {
        let account = validate_account_number(account)?;
        let role_name = validate_role_name(role_name)?;
        let display_name = match display_name.trim() {
            "" => validate_display_name(&role_name)?,
            name => validate_display_name(name)?,
        };
        let color = validate_color(color)?;

        let key = RoleKey::new(account, role_name);
        let mut next = self.settings.clone();
        next.role_settings.insert(
            key.to_string(),
            DisplayConfig::new(display_name, color).updated_at(now),
        );
        self.commit(next).await?;
        tracing::debug!(role_key = %key, "role saved");
        Ok(key)
    }

    /// Returns false when there was nothing to delete
    pub async fn delete_account(&mut self, number: &str) -> Result<bool> {
        let account = validate_account_number(number)?;
        if !self.settings.aws_account_settings.contains_key(account.as_str()) {
            return Ok(false);
        }
        let mut next = self.settings.clone();
        next.aws_account_settings.remove(account.as_str());
        self.commit(next).await?;
        Ok(true)
    }

    pub async fn delete_role(&mut self, key: &RoleKey) -> Result<bool> {
        let key = key.to_string();
        if !self.settings.role_settings.contains_key(&key) {
            return Ok(false);
        }
        let mut next = self.settings.clone();
        next.role_settings.remove(&key);
        self.commit(next).await?;
        Ok(true)
    }

    /// Delete every listed account in one write; unknown entries are skipped.
    /// Returns how many were removed.
    pub async fn bulk_delete_accounts<I, S>(&mut self, numbers: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = self.settings.clone();
        let mut removed = 0;
        for number in numbers {
            let key = AccountNumber::parse(number.as_ref())
                .map(String::from)
                .unwrap_or_else(|| number.as_ref().to_string());
            if next.aws_account_settings.remove(&key).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            self.commit(next).await?;
        }
        Ok(removed)
    }

    /// Accounts whose number contains `term`, or whose name contains it
    /// ignoring case. An empty term matches everything.
    pub fn filter_accounts(&self, term: &str) -> Vec<(&str, &AccountConfig)> {
        let needle = term.to_lowercase();
        self.settings
            .aws_account_settings
            .iter()
            .filter(|(number, config)| {
                number.contains(term) || config.name.to_lowercase().contains(&needle)
            })
            .map(|(number, config)| (number.as_str(), config))
            .collect()
    }

    pub async fn update_global(&mut self, patch: &GlobalSettingsPatch) -> Result<GlobalSettings> {
        let merged = patch.apply_to(&self.settings.global_settings);
        validate_global(&merged)?;
        let mut next = self.settings.clone();
        next.global_settings = merged.clone();
        self.commit(next).await?;
        Ok(merged)
    }

    /// Empty account and role maps with default globals
    pub async fn reset(&mut self) -> Result<()> {
        self.commit(StoredSettings::default()).await
    }

    /// Wipe the store entirely
    pub async fn clear(&mut self) -> Result<()> {
        self.store.clear().await?;
        self.settings = StoredSettings::default();
        Ok(())
    }

    pub fn export(&self, now: DateTime<Utc>) -> Result<(String, String)> {
        export_settings(&self.settings, now)
    }

    /// Replace settings from an export file. Nothing is written when the
    /// file is rejected.
    pub async fn import(&mut self, json: &str) -> Result<ImportSummary> {
        let (next, summary) = apply_import(json, &self.settings)?;
        self.commit(next).await?;
        tracing::info!(accounts = summary.accounts, roles = summary.roles, "settings imported");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IndicatorError, ValidationError};
    use crate::store::MemorySettingsStore;
    use chrono::TimeZone;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn editor() -> SettingsEditor<MemorySettingsStore> {
        block_on(SettingsEditor::open(MemorySettingsStore::new()))
    }

    #[test]
    fn test_save_account_normalises_number() {
        let mut editor = editor();
        let account = block_on(editor.save_account("1234-5678-9012", " Prod ", "#ff0000", now())).unwrap();
        assert_eq!(account.as_str(), "123456789012");

        let stored = editor.store().snapshot();
        let config = &stored.aws_account_settings["123456789012"];
        assert_eq!(config.name, "Prod");
        assert_eq!(config.color.as_deref(), Some("#ff0000"));
        assert_eq!(config.last_updated, Some(now()));
    }

    #[test]
    fn test_invalid_input_is_not_persisted() {
        let mut editor = editor();
        let result = block_on(editor.save_account("1234", "Prod", "#ff0000", now()));
        assert!(matches!(
            result,
            Err(IndicatorError::Validation(ValidationError::InvalidAccountNumber(_)))
        ));
        let result = block_on(editor.save_account("123456789012", &"x".repeat(26), "#ff0000", now()));
        assert!(matches!(
            result,
            Err(IndicatorError::Validation(ValidationError::DisplayNameTooLong { .. }))
        ));
        assert_eq!(editor.store().snapshot(), StoredSettings::default());
    }

    #[test]
    fn test_save_role_defaults_name_to_role() {
        let mut editor = editor();
        let key = block_on(editor.save_role("123456789012", "Admin", "", "#00ff00", now())).unwrap();
        assert_eq!(key.to_string(), "123456789012:Admin");
        assert_eq!(editor.settings().role_settings["123456789012:Admin"].name, "Admin");

        let missing = block_on(editor.save_role("123456789012", " ", "x", "#00ff00", now()));
        assert!(matches!(
            missing,
            Err(IndicatorError::Validation(ValidationError::MissingRoleName))
        ));
    }

    #[test]
    fn test_filter_and_bulk_delete() {
        let mut editor = editor();
        block_on(editor.save_account("111111111111", "Production", "#ff0000", now())).unwrap();
        block_on(editor.save_account("222222222222", "Staging", "#00ff00", now())).unwrap();
        block_on(editor.save_account("333333333333", "Dev sandbox", "#0000ff", now())).unwrap();

        let names: Vec<&str> = editor
            .filter_accounts("PROD")
            .iter()
            .map(|(_, c)| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Production"]);
        assert_eq!(editor.filter_accounts("2222").len(), 1);
        assert_eq!(editor.filter_accounts("").len(), 3);

        let removed = block_on(editor.bulk_delete_accounts(["111111111111", "2222-2222-2222", "999999999999"])).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(editor.settings().aws_account_settings.len(), 1);
    }

    #[test]
    fn test_update_global_validates_ranges() {
        let mut editor = editor();
        let patch = GlobalSettingsPatch {
            watermark_opacity: Some(1.2),
            ..Default::default()
        };
        assert!(block_on(editor.update_global(&patch)).is_err());

        let patch = GlobalSettingsPatch {
            enable_watermark: Some(false),
            ..Default::default()
        };
        let merged = block_on(editor.update_global(&patch)).unwrap();
        assert!(!merged.enable_watermark);
        assert_eq!(merged.watermark_size, 48);
    }

    #[test]
    fn test_store_failure_keeps_previous_state() {
        let mut editor = editor();
        block_on(editor.save_account("111111111111", "Production", "#ff0000", now())).unwrap();
        editor.store().set_failing(true);
        assert!(block_on(editor.delete_account("111111111111")).is_err());
        assert!(editor.settings().aws_account_settings.contains_key("111111111111"));
    }

    #[test]
    fn test_reset_and_clear() {
        let mut editor = editor();
        block_on(editor.save_account("111111111111", "Production", "#ff0000", now())).unwrap();
        block_on(editor.reset()).unwrap();
        assert_eq!(editor.settings(), &StoredSettings::default());
        block_on(editor.clear()).unwrap();
        assert_eq!(editor.store().snapshot(), StoredSettings::default());
    }
}
