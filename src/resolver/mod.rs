//! Display state resolution: identity + settings -> name and colors

pub mod color;

use crate::models::{
    AccountNumber, DisplayConfig, ResolvedDisplayState, RoleContext, Rgb, StoredSettings,
};

pub use color::{contrasting_text_color, with_opacity};

/// Longest display name shown before truncation
pub const MAX_DISPLAY_NAME: usize = 25;

const ELLIPSIS: &str = "...";

/// Keep the first 25 characters and append `...` when longer
pub fn truncate_name(name: &str) -> String {
    if name.chars().count() <= MAX_DISPLAY_NAME {
        return name.to_string();
    }
    let mut truncated: String = name.chars().take(MAX_DISPLAY_NAME).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

pub fn default_account_name(account: &AccountNumber) -> String {
    format!("AccountID: {account}")
}

/// Role config when the session is switched and one exists, otherwise the
/// config of the active account.
pub fn active_config<'a>(
    account: &AccountNumber,
    role: &RoleContext,
    settings: &'a StoredSettings,
) -> Option<&'a DisplayConfig> {
    role.role_key(Some(account))
        .and_then(|key| settings.role_config(&key))
        .or_else(|| settings.account_config(account))
}

fn display_name(account: &AccountNumber, role: &RoleContext, settings: &StoredSettings) -> String {
    if let (Some(key), Some(label)) = (role.role_key(Some(account)), role.label()) {
        let name = settings
            .role_config(&key)
            .map(|config| config.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(label);
        return truncate_name(name);
    }

    match settings.account_config(account).filter(|c| !c.name.is_empty()) {
        Some(config) => truncate_name(&config.name),
        None => truncate_name(&default_account_name(account)),
    }
}

/// Resolve what the watermark shows for `account` under `role`
pub fn resolve(account: &AccountNumber, role: &RoleContext, settings: &StoredSettings) -> ResolvedDisplayState {
    let opacity = settings.global_settings.watermark_opacity;
    let display_name = display_name(account, role, settings);

    let color = active_config(account, role, settings).and_then(|config| config.color.as_deref());
    let (background_color, text_color) = match color {
        Some(color) if !color.is_empty() => (
            with_opacity(color, opacity),
            contrasting_text_color(color).to_string(),
        ),
        _ => (
            color::rgba(Rgb::BLACK, opacity),
            color::LIGHT_TEXT.to_string(),
        ),
    };

    ResolvedDisplayState {
        display_name,
        background_color,
        text_color,
    }
}
