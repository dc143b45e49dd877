//! Helper utility functions

use chrono::NaiveDate;

/// Hosts the indicator runs on
const AWS_HOST_MARKERS: &[&str] = &[
    "amazonaws.com",
    "aws.amazon.com",
    "console.aws.amazon.com",
    "signin.aws.amazon.com",
];

/// Check if a tab URL belongs to the AWS console domain set
pub fn is_aws_url(url: &str) -> bool {
    AWS_HOST_MARKERS.iter().any(|marker| url.contains(marker))
}

/// Download name for a settings export taken on `date`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("aws-account-indicator-settings-{}.json", date.format("%Y-%m-%d"))
}

/// Format a bare account number as `xxxx-xxxx-xxxx` for display
pub fn format_account_number(digits: &str) -> String {
    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return digits.to_string();
    }
    format!("{}-{}-{}", &digits[0..4], &digits[4..8], &digits[8..12])
}
