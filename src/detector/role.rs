//! Switch-role detection

use crate::models::{DomNode, DomSnapshot, RoleContext};
use crate::parser::account_number::{contains_account_number, find_parenthesized};
use crate::parser::Selector;
use lazy_static::lazy_static;
use regex::Regex;

/// Longest role label accepted from the account menu (exclusive)
const MAX_ROLE_LABEL_CHARS: usize = 50;

/// `data-testid` values inside the account tile that are never the role label
const RESERVED_TEST_IDS: &[&str] = &["account-label", "default", "awsc-account-info-tile"];

lazy_static! {
    static ref MENU_BUTTON: Selector =
        Selector::parse(r#"[data-testid="awsc-nav-account-menu-button"]"#).unwrap();
    static ref ACCOUNT_TILE: Selector =
        Selector::parse(r#"[data-testid="awsc-account-info-tile"]"#).unwrap();
    static ref ACCOUNT_LABEL: Selector =
        Selector::parse(r#"[data-testid="account-label"]"#).unwrap();
    static ref ANY_TEST_ID: Selector = Selector::parse("[data-testid]").unwrap();
    static ref GLOBAL_NAV_ROW: Selector = Selector::parse(r#"[class*="globalNav"]"#).unwrap();

    static ref ROLE_ARN: Regex =
        Regex::new(r"arn[=:]aws:iam::([0-9]{12}):role/([^&\s]+)").unwrap();
}

pub type RoleStrategy = fn(&DomSnapshot, &str) -> Option<RoleContext>;

/// Tried in order; the first strategy that recognises a switch wins
pub const ROLE_STRATEGIES: &[(&str, RoleStrategy)] = &[
    ("account-menu", from_account_menu),
    ("url", from_url),
];

pub fn detect_role(document: &DomSnapshot, url: &str) -> RoleContext {
    ROLE_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| {
            let role = strategy(document, url)?;
            tracing::debug!(strategy = *name, ?role, "switch role detected");
            Some(role)
        })
        .unwrap_or_default()
}

/// The console header shows the account label on the first line and the role
/// display name on a second line while a role is assumed.
pub fn from_account_menu(document: &DomSnapshot, _url: &str) -> Option<RoleContext> {
    let menu = MENU_BUTTON.query_first(&document.root)?;
    let tile = ACCOUNT_TILE.query_first(menu)?;
    let label = ACCOUNT_LABEL.query_first(tile);
    let label_text = label.map(|l| l.text_content().trim().to_string());

    let role_element = role_element_by_test_id(tile)
        .or_else(|| role_element_by_row(tile, label_text.as_deref()))?;

    let role_text = role_element.text_content().trim().to_string();
    let len = role_text.chars().count();
    if len == 0 || len >= MAX_ROLE_LABEL_CHARS {
        return None;
    }
    if label_text.as_deref() == Some(role_text.as_str()) || contains_account_number(&role_text) {
        return None;
    }

    let source_account_number = label.and_then(|l| find_parenthesized(&l.text_content()));

    Some(RoleContext {
        is_switch_role: true,
        role_name: Some(role_text.clone()),
        role_display_name: Some(role_text),
        source_account_number,
    })
}

/// Elements whose `data-testid` is the role label itself (e.g. `DevVodStream`)
fn role_element_by_test_id(tile: &DomNode) -> Option<&DomNode> {
    ANY_TEST_ID.query_all(tile).into_iter().find(|el| {
        el.attr("data-testid")
            .map(|id| {
                !id.is_empty() && !RESERVED_TEST_IDS.contains(&id) && !id.starts_with("awsc-")
            })
            .unwrap_or(false)
    })
}

fn role_element_by_row<'a>(tile: &'a DomNode, label_text: Option<&str>) -> Option<&'a DomNode> {
    let label_text = label_text?;
    GLOBAL_NAV_ROW.query_all(tile).into_iter().find(|row| {
        let text = row.text_content();
        let text = text.trim();
        !text.is_empty()
            && !text.contains('(')
            && !contains_account_number(text)
            && text.chars().count() < MAX_ROLE_LABEL_CHARS
            && !label_text.contains(text)
    })
}

/// Federation and switch-role URLs carry the role in the query string
pub fn from_url(_document: &DomSnapshot, url: &str) -> Option<RoleContext> {
    if let Some(caps) = ROLE_ARN.captures(url) {
        let role_name = caps.get(2).map(|m| m.as_str().to_string());
        return Some(RoleContext {
            is_switch_role: true,
            role_display_name: role_name.clone(),
            role_name,
            source_account_number: None,
        });
    }

    if url.contains("switchrole") || url.contains("switch_role") {
        return Some(RoleContext {
            is_switch_role: true,
            ..Default::default()
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu(tile: DomNode) -> DomSnapshot {
        DomSnapshot::new(
            DomNode::element("body").with_child(
                DomNode::element("button")
                    .with_attr("data-testid", "awsc-nav-account-menu-button")
                    .with_child(tile),
            ),
        )
    }

    fn tile() -> DomNode {
        DomNode::element("div").with_attr("data-testid", "awsc-account-info-tile")
    }

    fn label(text: &str) -> DomNode {
        DomNode::element("span")
            .with_attr("data-testid", "account-label")
            .with_text(text)
    }

    #[test]
    fn test_role_from_dynamic_test_id() {
        let document = menu(
            tile()
                .with_child(label("AWSorg VideoTrim development (0396-1286-8717)"))
                .with_child(
                    DomNode::element("span")
                        .with_attr("data-testid", "DevVodStream")
                        .with_text(" DevVodStream "),
                ),
        );

        let role = from_account_menu(&document, "").unwrap();
        assert!(role.is_switch_role);
        assert_eq!(role.role_name.as_deref(), Some("DevVodStream"));
        assert_eq!(role.role_display_name.as_deref(), Some("DevVodStream"));
        assert_eq!(
            role.source_account_number.unwrap().as_str(),
            "039612868717"
        );
    }

    #[test]
    fn test_reserved_test_ids_are_skipped() {
        let document = menu(
            tile()
                .with_child(label("Prod (1111-2222-3333)"))
                .with_child(DomNode::element("span").with_attr("data-testid", "default").with_text("x"))
                .with_child(
                    DomNode::element("span")
                        .with_attr("data-testid", "awsc-copy-account-id")
                        .with_text("Copy"),
                ),
        );
        assert!(from_account_menu(&document, "").is_none());
    }

    #[test]
    fn test_role_from_global_nav_row() {
        let document = menu(
            tile()
                .with_child(
                    DomNode::element("div")
                        .with_attr("class", "globalNav-1256")
                        .with_child(label("Prod (1111-2222-3333)")),
                )
                .with_child(
                    DomNode::element("div")
                        .with_attr("class", "globalNav-1256")
                        .with_text("ReadOnly"),
                ),
        );

        let role = from_account_menu(&document, "").unwrap();
        assert_eq!(role.role_name.as_deref(), Some("ReadOnly"));
        assert_eq!(role.source_account_number.unwrap().as_str(), "111122223333");
    }

    #[test]
    fn test_plain_session_has_no_role() {
        let document = menu(tile().with_child(label("Prod (1111-2222-3333)")));
        assert!(from_account_menu(&document, "").is_none());
        assert_eq!(
            detect_role(&document, "https://console.aws.amazon.com/ec2/home"),
            RoleContext::not_switched()
        );
    }

    #[test]
    fn test_overlong_role_label_is_ignored() {
        let long = "x".repeat(50);
        let document = menu(
            tile()
                .with_child(label("Prod (1111-2222-3333)"))
                .with_child(DomNode::element("span").with_attr("data-testid", "Role").with_text(long)),
        );
        assert!(from_account_menu(&document, "").is_none());
    }

    #[test]
    fn test_role_from_arn_in_url() {
        let url = "https://signin.aws.amazon.com/switchrole?roleArn=arn:aws:iam::123456789012:role/Admin&displayName=x";
        let role = from_url(&DomSnapshot::new(DomNode::element("body")), url).unwrap();
        assert!(role.is_switch_role);
        assert_eq!(role.role_name.as_deref(), Some("Admin"));
        assert!(role.source_account_number.is_none());
    }

    #[test]
    fn test_switchrole_url_without_arn() {
        let role = from_url(
            &DomSnapshot::new(DomNode::element("body")),
            "https://signin.aws.amazon.com/switch_role?account=1",
        )
        .unwrap();
        assert!(role.is_switch_role);
        assert!(role.role_name.is_none());
    }

    #[test]
    fn test_account_menu_wins_over_url() {
        let document = menu(
            tile()
                .with_child(label("Prod (1111-2222-3333)"))
                .with_child(DomNode::element("span").with_attr("data-testid", "Ops").with_text("Ops")),
        );
        let role = detect_role(
            &document,
            "https://x.aws.amazon.com/?arn:aws:iam::123456789012:role/Admin",
        );
        assert_eq!(role.role_name.as_deref(), Some("Ops"));
    }
}
