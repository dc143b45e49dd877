//! Account and role identity detected from a console page

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 12-digit AWS account number, always stored without separators
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    pub const DIGITS: usize = 12;

    /// Normalize `1234-5678-9012`, `1234 5678 9012` or `123456789012`.
    /// Anything that does not reduce to exactly 12 digits is rejected.
    pub fn parse(input: &str) -> Option<Self> {
        let digits: String = input
            .trim()
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect();

        if digits.len() == Self::DIGITS && digits.chars().all(|c| c.is_ascii_digit()) {
            Some(Self(digits))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last four digits, used for the toolbar badge
    pub fn last_four(&self) -> &str {
        &self.0[Self::DIGITS - 4..]
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("not a 12-digit account number: {s}"))
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountNumber> for String {
    fn from(value: AccountNumber) -> Self {
        value.0
    }
}

/// Assumed-role session layered on top of the active account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleContext {
    pub is_switch_role: bool,

    #[serde(default)]
    pub role_name: Option<String>,

    #[serde(default)]
    pub role_display_name: Option<String>,

    /// Account the session was switched from. Lookup key only.
    #[serde(default)]
    pub source_account_number: Option<AccountNumber>,
}

impl RoleContext {
    pub fn not_switched() -> Self {
        Self::default()
    }

    /// Role label shown when no role config exists
    pub fn label(&self) -> Option<&str> {
        self.role_display_name
            .as_deref()
            .or(self.role_name.as_deref())
    }

    /// Settings key for this role, falling back to the active account when
    /// the source account could not be read from the page.
    pub fn role_key(&self, active: Option<&AccountNumber>) -> Option<RoleKey> {
        if !self.is_switch_role {
            return None;
        }
        let role_name = self.role_name.as_ref()?;
        let account = self.source_account_number.as_ref().or(active)?;
        Some(RoleKey::new(account.clone(), role_name.clone()))
    }
}

/// `<sourceAccountNumber>:<roleName>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleKey {
    pub account: AccountNumber,
    pub role_name: String,
}

impl RoleKey {
    pub fn new(account: AccountNumber, role_name: impl Into<String>) -> Self {
        Self {
            account,
            role_name: role_name.into(),
        }
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.account, self.role_name)
    }
}

impl FromStr for RoleKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (account, role_name) = s
            .split_once(':')
            .ok_or_else(|| format!("role key is missing ':' separator: {s}"))?;
        if role_name.is_empty() {
            return Err(format!("role key has an empty role name: {s}"));
        }
        Ok(Self::new(account.parse()?, role_name))
    }
}

/// Output of one detection pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub account: Option<AccountNumber>,
    pub role: RoleContext,
}

impl Detection {
    pub fn is_found(&self) -> bool {
        self.account.is_some()
    }

    /// Compact key used to tell whether a pass changed anything visible
    pub fn state_key(&self) -> String {
        format!(
            "{}-{}-{}",
            self.account.as_ref().map(|a| a.as_str()).unwrap_or("null"),
            self.role.role_name.as_deref().unwrap_or("none"),
            self.role.is_switch_role
        )
    }

    pub fn role_key(&self) -> Option<RoleKey> {
        self.role.role_key(self.account.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("123456789012", Some("123456789012") ; "bare")]
    #[test_case("1234-5678-9012", Some("123456789012") ; "dashes")]
    #[test_case(" 1234 5678 9012 ", Some("123456789012") ; "spaces")]
    #[test_case("12345678901", None ; "eleven digits")]
    #[test_case("1234567890123", None ; "thirteen digits")]
    #[test_case("1234-5678-901a", None ; "letter")]
    #[test_case("", None ; "empty")]
    fn test_parse_account_number(input: &str, expected: Option<&str>) {
        assert_eq!(
            AccountNumber::parse(input).as_ref().map(|a| a.as_str()),
            expected
        );
    }

    #[test]
    fn test_last_four() {
        let account = AccountNumber::parse("111122223333").unwrap();
        assert_eq!(account.last_four(), "3333");
    }

    #[test]
    fn test_role_key_round_trip() {
        let key: RoleKey = "111111111111:Admin".parse().unwrap();
        assert_eq!(key.account.as_str(), "111111111111");
        assert_eq!(key.role_name, "Admin");
        assert_eq!(key.to_string(), "111111111111:Admin");
    }

    #[test]
    fn test_role_key_keeps_colons_in_role_name() {
        let key: RoleKey = "111111111111:team:dev".parse().unwrap();
        assert_eq!(key.role_name, "team:dev");
    }

    #[test]
    fn test_role_key_prefers_source_account() {
        let role = RoleContext {
            is_switch_role: true,
            role_name: Some("Dev".into()),
            role_display_name: Some("Dev".into()),
            source_account_number: AccountNumber::parse("111111111111"),
        };
        let active = AccountNumber::parse("222222222222").unwrap();
        assert_eq!(
            role.role_key(Some(&active)).unwrap().to_string(),
            "111111111111:Dev"
        );
    }

    #[test]
    fn test_role_key_falls_back_to_active_account() {
        let role = RoleContext {
            is_switch_role: true,
            role_name: Some("Dev".into()),
            ..Default::default()
        };
        let active = AccountNumber::parse("222222222222").unwrap();
        assert_eq!(
            role.role_key(Some(&active)).unwrap().to_string(),
            "222222222222:Dev"
        );
        assert!(RoleContext::not_switched().role_key(Some(&active)).is_none());
    }

    #[test]
    fn test_state_key() {
        let detection = Detection {
            account: AccountNumber::parse("123456789012"),
            role: RoleContext::not_switched(),
        };
        assert_eq!(detection.state_key(), "123456789012-none-false");
        assert_eq!(Detection::default().state_key(), "null-none-false");
    }
}
