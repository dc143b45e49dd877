//! Account number extraction strategies

use crate::models::{AccountNumber, DomSnapshot, RoleContext};
use crate::parser::account_number::{find_all, find_first};
use crate::parser::Selector;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// Console header layouts, most specific first
pub const ACCOUNT_SELECTORS: &[&str] = &[
    // Current console
    r#"[data-testid="account-detail-menu"] span"#,
    r#"[data-testid="account-detail-menu"]"#,
    r#"[data-testid="account-detail-menu"] div"#,
    // Legacy console
    ".ccl-account-panel .ccl-account-number",
    ".ccl-account-panel",
    r#"[data-testid="account-id"]"#,
    ".awsui-util-action-stripe .awsui-util-action-stripe-content",
    // Header
    "#nav-usernameMenu",
    ".nav-menu-item",
    ".awsui-button-dropdown-content",
    // SSO portal
    ".awsui-context-header",
    r#"[class*="account"]"#,
    r#"[data-testid*="account"]"#,
    // Misc
    ".console-account-info",
    "#console-nav-account",
    ".account-menu",
    ".user-menu",
];

/// Text length bounds (exclusive) for the whole-document scans
const SWITCH_SCAN_MAX_CHARS: usize = 200;
const FALLBACK_SCAN_MAX_CHARS: usize = 100;
const SCAN_MIN_CHARS: usize = 5;

const SEPARATED: &str = r"([0-9]{4}[-\s]?[0-9]{4}[-\s]?[0-9]{4})";
const BARE: &str = r"([0-9]{12})";

lazy_static! {
    static ref HEADER_SELECTORS: Vec<Selector> = ACCOUNT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect();

    /// Tried in order against the full URL
    static ref URL_PATTERNS: Vec<Regex> = [
        format!(r"(?i)account[=/]{SEPARATED}"),
        format!(r"(?i)account[=/]{BARE}"),
        format!(r"(?i)accountId[=/]{SEPARATED}"),
        format!(r"(?i)accountId[=/]{BARE}"),
        format!(r"(?i)account_id[=/]{SEPARATED}"),
        format!(r"(?i)account_id[=/]{BARE}"),
        format!(r"{SEPARATED}\.amazonaws\.com"),
        format!(r"{BARE}\.amazonaws\.com"),
        format!(r"(?i)console\.aws\.amazon\.com/[^/]*/[^/]*/.*[?&]account[=/]{SEPARATED}"),
        format!(r"(?i)console\.aws\.amazon\.com/[^/]*/[^/]*/.*[?&]account[=/]{BARE}"),
        format!(r"/{SEPARATED}/"),
        format!(r"/{BARE}/"),
        format!(r"[?&]{SEPARATED}[?&]"),
        format!(r"[?&]{BARE}[?&]"),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
}

pub type AccountStrategy = fn(&DomSnapshot, &str, &RoleContext) -> Option<AccountNumber>;

/// Order used while a role is assumed: the switched-to account first
pub const SWITCHED_STRATEGIES: &[(&str, AccountStrategy)] = &[
    ("switch-target", from_switch_target),
    ("header-selectors", from_header_selectors),
    ("document-scan", from_document_scan),
    ("url", from_url),
];

pub const DIRECT_STRATEGIES: &[(&str, AccountStrategy)] = &[
    ("header-selectors", from_header_selectors),
    ("document-scan", from_document_scan),
    ("url", from_url),
];

pub fn detect_account(document: &DomSnapshot, url: &str, role: &RoleContext) -> Option<AccountNumber> {
    let strategies = if role.is_switch_role {
        SWITCHED_STRATEGIES
    } else {
        DIRECT_STRATEGIES
    };

    strategies.iter().find_map(|(name, strategy)| {
        let account = strategy(document, url, role)?;
        tracing::debug!(strategy = *name, %account, "account number detected");
        Some(account)
    })
}

/// Distinct account numbers in visible elements whose text length is in
/// `(SCAN_MIN_CHARS, max_chars)`, in document order
pub fn scan_visible_accounts(document: &DomSnapshot, max_chars: usize) -> Vec<AccountNumber> {
    let mut seen = HashSet::new();
    let mut accounts = Vec::new();

    for element in document.elements() {
        if !element.visible {
            continue;
        }
        let text = element.text_content();
        let len = text.chars().count();
        if len <= SCAN_MIN_CHARS || len >= max_chars {
            continue;
        }
        for account in find_all(&text) {
            if seen.insert(account.clone()) {
                accounts.push(account);
            }
        }
    }

    accounts
}

/// First visible account number that is not the account the role was
/// assumed from. With more than two candidates, document order decides.
pub fn from_switch_target(document: &DomSnapshot, _url: &str, role: &RoleContext) -> Option<AccountNumber> {
    scan_visible_accounts(document, SWITCH_SCAN_MAX_CHARS)
        .into_iter()
        .find(|account| Some(account) != role.source_account_number.as_ref())
}

pub fn from_header_selectors(document: &DomSnapshot, _url: &str, _role: &RoleContext) -> Option<AccountNumber> {
    for selector in HEADER_SELECTORS.iter() {
        for element in selector.query_all(&document.root) {
            let text = element.text_content();
            if let Some(account) = find_first(&text) {
                return Some(account);
            }

            let combined = format!(
                "{} {} {}",
                text,
                element.attr("title").unwrap_or(""),
                element.attr("aria-label").unwrap_or("")
            );
            if let Some(account) = find_first(&combined) {
                return Some(account);
            }
        }
    }
    None
}

pub fn from_document_scan(document: &DomSnapshot, _url: &str, _role: &RoleContext) -> Option<AccountNumber> {
    document
        .elements()
        .into_iter()
        .filter(|element| element.visible)
        .find_map(|element| {
            let text = element.text_content();
            let len = text.chars().count();
            if len <= SCAN_MIN_CHARS || len >= FALLBACK_SCAN_MAX_CHARS {
                return None;
            }
            find_first(&text)
        })
}

pub fn from_url(_document: &DomSnapshot, url: &str, _role: &RoleContext) -> Option<AccountNumber> {
    URL_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(url)
            .and_then(|caps| caps.get(1))
            .and_then(|m| AccountNumber::parse(m.as_str()))
    })
}
