//! Input validation for the settings editor

use crate::error::ValidationError;
use crate::models::{AccountNumber, GlobalSettings};
use crate::parser::color::parse_color;
use crate::resolver::MAX_DISPLAY_NAME;

/// Accepts `123456789012`, `1234-5678-9012` and `1234 5678 9012`
pub fn validate_account_number(input: &str) -> Result<AccountNumber, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::MissingAccountNumber);
    }
    AccountNumber::parse(input).ok_or_else(|| ValidationError::InvalidAccountNumber(input.to_string()))
}

/// Trimmed display name of 1 to 25 characters
pub fn validate_display_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingDisplayName);
    }
    let len = name.chars().count();
    if len > MAX_DISPLAY_NAME {
        return Err(ValidationError::DisplayNameTooLong {
            len,
            max: MAX_DISPLAY_NAME,
        });
    }
    Ok(name.to_string())
}

pub fn validate_role_name(role_name: &str) -> Result<String, ValidationError> {
    let role_name = role_name.trim();
    if role_name.is_empty() {
        return Err(ValidationError::MissingRoleName);
    }
    Ok(role_name.to_string())
}

pub fn validate_color(color: &str) -> Result<String, ValidationError> {
    let color = color.trim();
    match parse_color(color) {
        Some(_) => Ok(color.to_string()),
        None => Err(ValidationError::InvalidColor(color.to_string())),
    }
}

pub fn validate_global(settings: &GlobalSettings) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&settings.watermark_opacity) {
        return Err(ValidationError::InvalidOpacity(settings.watermark_opacity));
    }
    if settings.watermark_size == 0 {
        return Err(ValidationError::InvalidSize(settings.watermark_size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("123456789012" ; "bare")]
    #[test_case(" 1234-5678-9012 " ; "dashed with padding")]
    #[test_case("1234 5678 9012" ; "spaced")]
    fn test_valid_account_numbers(input: &str) {
        assert_eq!(validate_account_number(input).unwrap().as_str(), "123456789012");
    }

    #[test]
    fn test_invalid_account_numbers() {
        assert_eq!(
            validate_account_number("   "),
            Err(ValidationError::MissingAccountNumber)
        );
        assert_eq!(
            validate_account_number("1234-5678"),
            Err(ValidationError::InvalidAccountNumber("1234-5678".into()))
        );
        assert!(validate_account_number("abcd-efgh-ijkl").is_err());
    }

    #[test]
    fn test_display_name_limits() {
        assert_eq!(validate_display_name(" Prod "), Ok("Prod".to_string()));
        assert_eq!(validate_display_name(""), Err(ValidationError::MissingDisplayName));
        assert_eq!(
            validate_display_name(&"x".repeat(26)),
            Err(ValidationError::DisplayNameTooLong { len: 26, max: 25 })
        );
        assert!(validate_display_name(&"x".repeat(25)).is_ok());
    }

    #[test]
    fn test_colors() {
        assert!(validate_color("#ff9500").is_ok());
        assert!(validate_color("rgb(1, 2, 3)").is_ok());
        assert_eq!(
            validate_color("blurple"),
            Err(ValidationError::InvalidColor("blurple".into()))
        );
    }

    #[test]
    fn test_global_ranges() {
        assert!(validate_global(&GlobalSettings::default()).is_ok());
        let too_opaque = GlobalSettings {
            watermark_opacity: 1.5,
            ..Default::default()
        };
        assert_eq!(validate_global(&too_opaque), Err(ValidationError::InvalidOpacity(1.5)));
        let zero = GlobalSettings {
            watermark_size: 0,
            ..Default::default()
        };
        assert_eq!(validate_global(&zero), Err(ValidationError::InvalidSize(0)));
    }
}
