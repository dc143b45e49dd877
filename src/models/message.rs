//! Messages exchanged between the background, page and settings contexts

use super::identity::{AccountNumber, Detection};
use super::settings::{SettingsChange, StoredSettings, StoredSettingsPatch};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    Ping,
    GetCurrentAccount,
    GetAccountInfo,
    Refresh,
    SettingsChanged {
        #[serde(default)]
        changes: SettingsChange,
    },
    #[serde(rename_all = "camelCase")]
    UpdateBadge {
        #[serde(default)]
        account_number: Option<AccountNumber>,
    },
    GetSettings,
    /// Only the keys present in `settings` are written
    SaveSettings {
        settings: StoredSettingsPatch,
    },
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::GetCurrentAccount => "getCurrentAccount",
            Request::GetAccountInfo => "getAccountInfo",
            Request::Refresh => "refresh",
            Request::SettingsChanged { .. } => "settingsChanged",
            Request::UpdateBadge { .. } => "updateBadge",
            Request::GetSettings => "getSettings",
            Request::SaveSettings { .. } => "saveSettings",
        }
    }
}

/// Identity record answered to `getCurrentAccount` / `getAccountInfo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_number: Option<AccountNumber>,
    pub account_name: Option<String>,
    pub is_switch_role: bool,
    pub role_name: Option<String>,
    pub role_display_name: Option<String>,
    pub switch_role_source_account: Option<AccountNumber>,
    pub role_key: Option<String>,
}

impl AccountInfo {
    pub fn from_detection(detection: &Detection, account_name: Option<String>) -> Self {
        Self {
            account_number: detection.account.clone(),
            account_name,
            is_switch_role: detection.role.is_switch_role,
            role_name: detection.role.role_name.clone(),
            role_display_name: detection.role.role_display_name.clone(),
            switch_role_source_account: detection.role.source_account_number.clone(),
            role_key: detection.role_key().map(|k| k.to_string()),
        }
    }
}

// Variant order matters for untagged deserialization: the catch-all
// settings shape has to come last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Error { error: String },
    Alive { status: String },
    Success { success: bool },
    Account(AccountInfo),
    Settings(StoredSettings),
}

impl Response {
    pub fn alive() -> Self {
        Response::Alive {
            status: "alive".to_string(),
        }
    }

    pub fn success() -> Self {
        Response::Success { success: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            error: message.into(),
        }
    }

    pub fn unknown_action() -> Self {
        Self::error("Unknown action")
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

/// Toolbar badge for a tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub text: String,
    pub color: Option<String>,
    pub title: String,
}

impl Badge {
    pub const COLOR: &'static str = "#ff9500";

    pub fn for_account(account: Option<&AccountNumber>) -> Self {
        match account {
            Some(account) => Self {
                text: account.last_four().to_string(),
                color: Some(Self::COLOR.to_string()),
                title: format!("AWS Account: {}", account),
            },
            None => Self {
                text: String::new(),
                color: None,
                title: "AWS Account Indicator".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_wire_format() {
        let ping: Request = serde_json::from_str(r#"{"action":"ping"}"#).unwrap();
        assert_eq!(ping, Request::Ping);

        let badge: Request =
            serde_json::from_str(r#"{"action":"updateBadge","accountNumber":"123456789012"}"#)
                .unwrap();
        assert_eq!(
            badge,
            Request::UpdateBadge {
                account_number: AccountNumber::parse("123456789012")
            }
        );

        let changed: Request = serde_json::from_str(r#"{"action":"settingsChanged"}"#).unwrap();
        assert_eq!(changed.action(), "settingsChanged");
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(serde_json::from_str::<Request>(r#"{"action":"launchRockets"}"#).is_err());
    }

    #[test]
    fn test_response_wire_format() {
        assert_eq!(
            serde_json::to_value(Response::alive()).unwrap(),
            serde_json::json!({ "status": "alive" })
        );
        let parsed: Response = serde_json::from_str(r#"{"error":"Unknown action"}"#).unwrap();
        assert!(parsed.is_error());
    }

    #[test]
    fn test_account_info_serializes_nulls() {
        let info = AccountInfo::from_detection(&Detection::default(), None);
        let value = serde_json::to_value(Response::Account(info)).unwrap();
        assert_eq!(value["accountNumber"], serde_json::Value::Null);
        assert_eq!(value["isSwitchRole"], serde_json::Value::Bool(false));
    }

    #[test]
    fn test_badge_shows_last_four_digits() {
        let account = AccountNumber::parse("123456789012").unwrap();
        let badge = Badge::for_account(Some(&account));
        assert_eq!(badge.text, "9012");
        assert_eq!(badge.title, "AWS Account: 123456789012");
        assert_eq!(Badge::for_account(None).text, "");
    }
}
