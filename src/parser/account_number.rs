//! Account number extraction from free text

use crate::models::AccountNumber;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `1234-5678-9012`, `1234 5678 9012` and `123456789012`
    static ref SEPARATED: Regex =
        Regex::new(r"([0-9]{4}[-\s]?[0-9]{4}[-\s]?[0-9]{4})").unwrap();

    static ref BARE: Regex = Regex::new(r"([0-9]{12})").unwrap();

    /// The form used inside the console's account label: `Name (1234-5678-9012)`
    static ref PARENTHESIZED: Regex =
        Regex::new(r"\(([0-9]{4}[-\s]?[0-9]{4}[-\s]?[0-9]{4})\)").unwrap();
}

/// Matcher kinds in the order they are tried
const MATCHERS: &[fn() -> &'static Regex] = &[separated, bare];

fn separated() -> &'static Regex {
    &SEPARATED
}

fn bare() -> &'static Regex {
    &BARE
}

/// First account number in `text`, separator form first, then bare digits
pub fn find_first(text: &str) -> Option<AccountNumber> {
    MATCHERS.iter().find_map(|matcher| {
        matcher()
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| AccountNumber::parse(m.as_str()))
    })
}

/// Every account number in `text`: all separator-form matches, then all bare
/// matches. Duplicates are kept; callers dedupe across elements.
pub fn find_all(text: &str) -> Vec<AccountNumber> {
    MATCHERS
        .iter()
        .flat_map(|matcher| {
            matcher()
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .filter_map(|m| AccountNumber::parse(m.as_str()))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Account number written in parentheses, as in the account menu label
pub fn find_parenthesized(text: &str) -> Option<AccountNumber> {
    PARENTHESIZED
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| AccountNumber::parse(m.as_str()))
}

pub fn contains_account_number(text: &str) -> bool {
    SEPARATED.is_match(text)
}
