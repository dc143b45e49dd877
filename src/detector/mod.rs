//! Account and switch-role detection from page state
//!
//! Both halves are ordered lists of independent strategies; the first one
//! that produces a result wins. Detection never mutates its input, so running
//! it twice on the same capture yields the same answer.

pub mod account;
pub mod role;

use crate::models::{Detection, DomSnapshot, PageCapture};

pub use account::detect_account;
pub use role::detect_role;

/// Detect the active account and any assumed role
pub fn detect(document: &DomSnapshot, url: &str) -> Detection {
    // 1. Role first: it decides which account number is the active one
    let role = detect_role(document, url);

    // 2. Account number, switched-to account first when a role is assumed
    let account = detect_account(document, url, &role);

    let detection = Detection { account, role };
    tracing::debug!(state = %detection.state_key(), "detection pass finished");
    detection
}

pub fn detect_capture(capture: &PageCapture) -> Detection {
    detect(&capture.document, &capture.url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DomNode;
    use pretty_assertions::assert_eq;

    fn switched_console() -> PageCapture {
        let tile = DomNode::element("div")
            .with_attr("data-testid", "awsc-account-info-tile")
            .with_child(
                DomNode::element("span")
                    .with_attr("data-testid", "account-label")
                    .with_text("Org root (1111-1111-1111)"),
            )
            .with_child(
                DomNode::element("span")
                    .with_attr("data-testid", "Developer")
                    .with_text("Developer"),
            );
        let header = DomNode::element("header").with_child(
            DomNode::element("button")
                .with_attr("data-testid", "awsc-nav-account-menu-button")
                .with_child(tile),
        );
        let main = DomNode::element("main")
            .with_child(DomNode::element("p").with_text("Account ID: 2222-2222-2222"));
        let root = DomNode::element("html").hidden().with_child(
            DomNode::element("body").hidden().with_child(header).with_child(main),
        );
        PageCapture::new("https://us-east-1.console.aws.amazon.com/console/home", root)
    }

    #[test]
    fn test_switched_session_picks_target_account() {
        let detection = detect_capture(&switched_console());
        assert!(detection.role.is_switch_role);
        assert_eq!(detection.role.role_name.as_deref(), Some("Developer"));
        assert_eq!(detection.account.unwrap().as_str(), "222222222222");
    }

    #[test]
    fn test_detection_is_idempotent() {
        let capture = switched_console();
        let first = detect_capture(&capture);
        let second = detect_capture(&capture);
        assert_eq!(first, second);
    }

    #[test]
    fn test_nothing_found() {
        let capture = PageCapture::new(
            "https://console.aws.amazon.com/console/home",
            DomNode::element("body").with_text("Welcome"),
        );
        let detection = detect_capture(&capture);
        assert!(!detection.is_found());
        assert!(!detection.role.is_switch_role);
    }
}
