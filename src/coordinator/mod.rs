//! Background coordination across tabs
//!
//! The coordinator never touches a page directly. It talks to tabs through
//! an [`ExtensionHost`] and to persisted settings through a
//! [`SettingsStore`]; both are async and may fail when the other side is
//! gone, which is routine and only logged.

use crate::error::Result;
use crate::models::{
    AccountInfo, AccountNumber, Badge, Request, Response, SettingsChange, StoredSettings,
};
use crate::store::SettingsStore;
use crate::utils::is_aws_url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type TabId = i32;

/// Storage area whose changes are relayed to tabs
pub const SYNC_AREA: &str = "sync";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    #[serde(default)]
    pub url: Option<String>,
}

impl TabInfo {
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: Some(url.into()),
        }
    }

    pub fn is_aws(&self) -> bool {
        self.url.as_deref().map(is_aws_url).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallReason {
    Install,
    Update,
    #[serde(other)]
    Other,
}

/// Who sent a runtime message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageSender {
    pub tab: Option<TabId>,
}

/// The browser's tab and action APIs
#[allow(async_fn_in_trait)]
pub trait ExtensionHost {
    async fn send_to_tab(&self, tab: TabId, request: &Request) -> Result<Response>;
    /// Load the content script into a tab
    async fn inject_indicator(&self, tab: TabId) -> Result<()>;
    async fn list_tabs(&self) -> Result<Vec<TabInfo>>;
    async fn set_badge(&self, tab: TabId, badge: &Badge) -> Result<()>;
}

/// What happened to a tab after it finished loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabAction {
    Ignored,
    AlreadyActive,
    Injected,
    InjectionFailed,
}

pub struct TabCoordinator<H, St> {
    host: H,
    store: St,
}

impl<H: ExtensionHost, St: SettingsStore> TabCoordinator<H, St> {
    pub fn new(host: H, store: St) -> Self {
        Self { host, store }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// First install writes defaults; updates normalise what is stored.
    /// Returns whether anything was written.
    pub async fn on_installed(&self, reason: InstallReason) -> bool {
        tracing::info!(?reason, "extension installed or updated");
        match reason {
            InstallReason::Install => match self.store.save(&StoredSettings::default()).await {
                Ok(()) => {
                    tracing::info!("default settings initialized");
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to set default settings");
                    false
                }
            },
            InstallReason::Update => self.migrate().await,
            InstallReason::Other => false,
        }
    }

    async fn migrate(&self) -> bool {
        let stored = match self.store.load_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read settings for migration");
                return false;
            }
        };

        // Globals missing from storage are written out as defaults
        let missing_globals = stored.global_settings.is_none();
        let current = stored.into_settings();
        let migrated = migrate_settings(&current);
        if migrated == current && !missing_globals {
            return false;
        }

        match self.store.save(&migrated).await {
            Ok(()) => {
                tracing::info!("settings migrated");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to migrate settings");
                false
            }
        }
    }

    /// Make sure a freshly loaded AWS tab runs the indicator. Probes first
    /// and injects only when nothing answered.
    pub async fn on_tab_updated(&self, tab: &TabInfo, status: TabStatus) -> TabAction {
        if status != TabStatus::Complete || !tab.is_aws() {
            return TabAction::Ignored;
        }
        self.ensure_injected(tab.id).await
    }

    pub async fn ensure_injected(&self, tab: TabId) -> TabAction {
        if self.host.send_to_tab(tab, &Request::Ping).await.is_ok() {
            return TabAction::AlreadyActive;
        }

        match self.host.inject_indicator(tab).await {
            Ok(()) => {
                tracing::debug!(tab, "content script injected");
                TabAction::Injected
            }
            Err(e) => {
                tracing::warn!(tab, error = %e, "failed to inject content script");
                TabAction::InjectionFailed
            }
        }
    }

    async fn aws_tabs(&self) -> Vec<TabInfo> {
        match self.host.list_tabs().await {
            Ok(tabs) => tabs.into_iter().filter(TabInfo::is_aws).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to list tabs");
                Vec::new()
            }
        }
    }

    /// Send `request` to every AWS tab, skipping tabs that do not answer.
    /// Returns how many tabs answered.
    async fn broadcast(&self, request: &Request) -> usize {
        let mut delivered = 0;
        for tab in self.aws_tabs().await {
            match self.host.send_to_tab(tab.id, request).await {
                Ok(_) => delivered += 1,
                Err(e) => tracing::debug!(tab = tab.id, error = %e, "tab not listening"),
            }
        }
        delivered
    }

    pub async fn on_storage_changed(&self, area: &str, change: SettingsChange) -> usize {
        if area != SYNC_AREA || change.is_empty() {
            return 0;
        }
        self.broadcast(&Request::SettingsChanged { changes: change }).await
    }

    pub async fn refresh_all_tabs(&self) -> usize {
        self.broadcast(&Request::Refresh).await
    }

    /// Identity from the first AWS tab that reports an account number.
    /// Used to pre-fill the quick config form.
    pub async fn current_account(&self) -> Option<AccountInfo> {
        for tab in self.aws_tabs().await {
            match self.host.send_to_tab(tab.id, &Request::GetCurrentAccount).await {
                Ok(Response::Account(info)) if info.account_number.is_some() => return Some(info),
                Ok(_) => {}
                Err(e) => tracing::debug!(tab = tab.id, error = %e, "tab not listening"),
            }
        }
        None
    }

    pub async fn handle_message(&self, request: &Request, sender: MessageSender) -> Response {
        match request {
            Request::GetCurrentAccount => {
                let Some(tab) = sender.tab else {
                    return Response::error("No sender tab");
                };
                match self.host.send_to_tab(tab, &Request::GetAccountInfo).await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::debug!(tab, error = %e, "account query failed");
                        Response::error("Could not get account information")
                    }
                }
            }
            Request::UpdateBadge { account_number } => {
                let Some(tab) = sender.tab else {
                    return Response::error("No sender tab");
                };
                match self.update_badge(tab, account_number.as_ref()).await {
                    Ok(()) => Response::success(),
                    Err(e) => Response::error(e.to_string()),
                }
            }
            Request::GetSettings => match self.store.load().await {
                Ok(settings) => Response::Settings(settings),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to get settings");
                    Response::Settings(StoredSettings::default())
                }
            },
            Request::SaveSettings { settings } if settings.is_empty() => Response::success(),
            Request::SaveSettings { settings } => {
                let current = match self.store.load().await {
                    Ok(current) => current,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read settings before save");
                        return Response::error(e.to_string());
                    }
                };
                match self.store.save(&settings.apply_to(&current)).await {
                    Ok(()) => Response::success(),
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to save settings");
                        Response::error(e.to_string())
                    }
                }
            }
            other => {
                tracing::debug!(action = other.action(), "message not handled in background");
                Response::unknown_action()
            }
        }
    }

    pub async fn update_badge(&self, tab: TabId, account: Option<&AccountNumber>) -> Result<()> {
        self.host.set_badge(tab, &Badge::for_account(account)).await
    }
}

/// Bring stored settings up to the current shape: account keys written
/// with separators are normalised and out-of-range globals reset.
pub fn migrate_settings(settings: &StoredSettings) -> StoredSettings {
    let mut migrated = settings.clone();

    // Keys already in bare form win over separated duplicates
    let (bare, separated): (Vec<_>, Vec<_>) = settings
        .aws_account_settings
        .iter()
        .partition(|(key, _)| {
            AccountNumber::parse(key).is_some_and(|number| number.as_str() == key.as_str())
        });
    let mut accounts = BTreeMap::new();
    for (key, config) in bare.into_iter().chain(separated) {
        let key = AccountNumber::parse(key)
            .map(String::from)
            .unwrap_or_else(|| key.clone());
        accounts.entry(key).or_insert_with(|| config.clone());
    }
    migrated.aws_account_settings = accounts;

    let defaults = crate::models::GlobalSettings::default();
    let globals = &mut migrated.global_settings;
    if !(0.0..=1.0).contains(&globals.watermark_opacity) {
        globals.watermark_opacity = defaults.watermark_opacity;
    }
    if globals.watermark_size == 0 {
        globals.watermark_size = defaults.watermark_size;
    }

    migrated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DisplayConfig;

    #[test]
    fn test_migration_normalises_account_keys() {
        let mut settings = StoredSettings::default();
        settings
            .aws_account_settings
            .insert("1234-5678-9012".into(), DisplayConfig::new("Prod", "#ff0000"));
        let migrated = migrate_settings(&settings);
        assert!(migrated.aws_account_settings.contains_key("123456789012"));
        assert_eq!(migrated.aws_account_settings.len(), 1);
    }

    #[test]
    fn test_migration_keeps_bare_key_over_separated_duplicate() {
        let mut settings = StoredSettings::default();
        settings
            .aws_account_settings
            .insert("1111-1111-1111".into(), DisplayConfig::new("Legacy", "#ff0000"));
        settings
            .aws_account_settings
            .insert("111111111111".into(), DisplayConfig::new("Current", "#00ff00"));
        let migrated = migrate_settings(&settings);
        assert_eq!(migrated.aws_account_settings.len(), 1);
        assert_eq!(migrated.aws_account_settings["111111111111"].name, "Current");
    }

    #[test]
    fn test_migration_resets_invalid_globals() {
        let mut settings = StoredSettings::default();
        settings.global_settings.watermark_opacity = 4.0;
        settings.global_settings.watermark_size = 0;
        let migrated = migrate_settings(&settings);
        assert_eq!(migrated.global_settings.watermark_opacity, 0.3);
        assert_eq!(migrated.global_settings.watermark_size, 48);
    }

    #[test]
    fn test_migration_is_a_no_op_on_current_settings() {
        let mut settings = StoredSettings::default();
        settings
            .aws_account_settings
            .insert("123456789012".into(), DisplayConfig::new("Prod", "#ff0000"));
        assert_eq!(migrate_settings(&settings), settings);
    }

    #[test]
    fn test_install_reason_wire_names() {
        let reason: InstallReason = serde_json::from_str(r#""chrome_update""#).unwrap();
        assert_eq!(reason, InstallReason::Other);
        let reason: InstallReason = serde_json::from_str(r#""update""#).unwrap();
        assert_eq!(reason, InstallReason::Update);
    }
}
