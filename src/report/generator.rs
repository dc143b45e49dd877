//! Markdown rendering of a detection report

use super::DetectionReport;
use crate::utils::helpers::format_account_number;

pub fn generate_markdown_report(report: &DetectionReport) -> String {
    let mut out = String::new();

    out.push_str("# AWS Account Detection Report\n\n");
    out.push_str(&format!("- **URL**: {}\n", report.url));
    out.push_str(&format!(
        "- **Detected**: {}\n\n",
        if report.detection.is_found() { "✅ Yes" } else { "❌ No" }
    ));

    // Identity
    out.push_str("## Identity\n\n");
    match &report.detection.account {
        Some(account) => out.push_str(&format!(
            "- **Account**: {}\n",
            format_account_number(account.as_str())
        )),
        None => out.push_str("- **Account**: not found\n"),
    }
    let role = &report.detection.role;
    if role.is_switch_role {
        out.push_str(&format!(
            "- **Role**: {}\n",
            role.role_name.as_deref().unwrap_or("unknown")
        ));
        if let Some(label) = role.role_display_name.as_deref() {
            out.push_str(&format!("- **Role label**: {}\n", label));
        }
        if let Some(source) = &role.source_account_number {
            out.push_str(&format!(
                "- **Switched from**: {}\n",
                format_account_number(source.as_str())
            ));
        }
        if let Some(key) = report.detection.role_key() {
            out.push_str(&format!("- **Role key**: `{}`\n", key));
        }
    } else {
        out.push_str("- **Role**: none\n");
    }
    out.push('\n');

    // Display
    if let Some(resolved) = &report.resolved {
        out.push_str("## Watermark\n\n");
        out.push_str(&format!("- **Name**: {}\n", resolved.display_name));
        out.push_str(&format!("- **Background**: `{}`\n", resolved.background_color));
        out.push_str(&format!("- **Text**: `{}`\n\n", resolved.text_color));
    }

    // Strategies
    out.push_str("## Strategies\n\n");
    out.push_str(&format!(
        "- role: {}\n",
        report.role_strategy.unwrap_or("no switch detected")
    ));
    let winner = report.winning_strategy();
    for outcome in &report.account_strategies {
        let result = match &outcome.account {
            Some(account) => account.to_string(),
            None => "-".to_string(),
        };
        let marker = if Some(outcome.name) == winner { " ⬅ used" } else { "" };
        out.push_str(&format!("- {}: {}{}\n", outcome.name, result, marker));
    }
    out.push('\n');

    if report.candidates.len() > 1 {
        out.push_str("## ⚠️ Multiple account numbers on page\n\n");
        for account in &report.candidates {
            out.push_str(&format!("- {}\n", format_account_number(account.as_str())));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "Observed element: `{}`\n",
        report.observer_target.unwrap_or("body")
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::super::inspect;
    use super::*;
    use crate::models::{DomNode, PageCapture, StoredSettings};

    #[test]
    fn test_report_marks_used_strategy() {
        let capture = PageCapture::new(
            "https://console.aws.amazon.com/billing/home?account=123456789012&x",
            DomNode::element("body"),
        );
        let markdown = generate_markdown_report(&inspect(&capture, &StoredSettings::default()));
        assert!(markdown.contains("- **Account**: 1234-5678-9012"));
        assert!(markdown.contains("- url: 123456789012 ⬅ used"));
        assert!(markdown.contains("- header-selectors: -"));
        assert!(markdown.contains("Observed element: `body`"));
        assert!(markdown.contains("AccountID: 123456789012"));
    }
}
