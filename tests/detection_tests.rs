//! End-to-end detection over saved page captures

use aws_account_indicator::models::{DisplayConfig, DomNode};
use aws_account_indicator::report::{generate_report, inspect};
use aws_account_indicator::{inspect_capture, load_capture, PageCapture, StoredSettings};
use pretty_assertions::assert_eq;

const SWITCHED_CONSOLE: &str = include_str!("fixtures/switched_console.json");

fn settings() -> StoredSettings {
    let mut settings = StoredSettings::default();
    settings
        .aws_account_settings
        .insert("222222222222".into(), DisplayConfig::new("Staging", "#000000"));
    settings
        .role_settings
        .insert("111111111111:Developer".into(), DisplayConfig::new("Staging dev", "#000000"));
    settings
}

#[test]
fn test_capture_file_detects_switched_account() {
    let capture = load_capture(SWITCHED_CONSOLE).unwrap();
    let (detection, resolved) = inspect_capture(&capture, &StoredSettings::default());

    assert!(detection.role.is_switch_role);
    assert_eq!(detection.role.role_name.as_deref(), Some("Developer"));
    assert_eq!(
        detection.role.source_account_number.as_ref().map(|a| a.as_str()),
        Some("111111111111")
    );
    assert_eq!(detection.account.as_ref().map(|a| a.as_str()), Some("222222222222"));

    // No role config: the role label is shown
    let resolved = resolved.unwrap();
    assert_eq!(resolved.display_name, "Developer");
}

#[test]
fn test_role_config_names_the_watermark() {
    let capture = load_capture(SWITCHED_CONSOLE).unwrap();
    let (_, resolved) = inspect_capture(&capture, &settings());
    let resolved = resolved.unwrap();

    assert_eq!(resolved.display_name, "Staging dev");
    assert_eq!(resolved.background_color, "rgba(0, 0, 0, 0.3)");
    assert_eq!(resolved.text_color, "#ffffff");
}

#[test]
fn test_account_from_url_only() {
    let capture = PageCapture::new(
        "https://console.aws.amazon.com/billing/home?account=123456789012&tab=1",
        DomNode::element("body").with_text("Loading"),
    );
    let (detection, resolved) = inspect_capture(&capture, &StoredSettings::default());

    assert_eq!(detection.account.as_ref().map(|a| a.as_str()), Some("123456789012"));
    assert_eq!(resolved.unwrap().display_name, "AccountID: 123456789012");
}

#[test]
fn test_page_without_identity_resolves_nothing() {
    let capture = PageCapture::new(
        "https://console.aws.amazon.com/console/home",
        DomNode::element("body").with_text("Welcome"),
    );
    let (detection, resolved) = inspect_capture(&capture, &settings());

    assert!(!detection.is_found());
    assert_eq!(resolved, None);
}

#[test]
fn test_malformed_capture_is_rejected() {
    assert!(load_capture(r#"{"url": "https://example.com"}"#).is_err());
    assert!(load_capture("not json").is_err());
}

#[test]
fn test_report_names_switch_target_strategy() {
    let capture = load_capture(SWITCHED_CONSOLE).unwrap();
    let report = inspect(&capture, &settings());

    assert_eq!(report.winning_strategy(), Some("switch-target"));

    let markdown = generate_report(&report);
    assert!(markdown.starts_with("# AWS Account Detection Report"));
    assert!(markdown.contains("Staging dev"));
    assert!(markdown.contains("Multiple account numbers"));
    assert!(markdown.contains("Observed element: `header`"));
}
