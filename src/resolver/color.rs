//! Opacity and contrast helpers for configured colors

use crate::models::Rgb;
use crate::parser::color::parse_color;

pub const DARK_TEXT: &str = "#000000";
pub const LIGHT_TEXT: &str = "#ffffff";

/// Brightness above which dark text is used
const CONTRAST_THRESHOLD: f64 = 128.0;

/// Perceived brightness: 0.299R + 0.587G + 0.114B
pub fn luminance(color: Rgb) -> f64 {
    (f64::from(color.r) * 299.0 + f64::from(color.g) * 587.0 + f64::from(color.b) * 114.0) / 1000.0
}

pub fn rgba(color: Rgb, opacity: f64) -> String {
    format!("rgba({}, {}, {}, {})", color.r, color.g, color.b, opacity)
}

/// Re-emit `color` as `rgba(..)` with the given alpha. Existing alpha is
/// replaced; unrecognised formats become black.
pub fn with_opacity(color: &str, opacity: f64) -> String {
    rgba(parse_color(color).unwrap_or(Rgb::BLACK), opacity)
}

/// Black or white, whichever reads better on the opaque base color
pub fn contrasting_text_color(color: &str) -> &'static str {
    match parse_color(color) {
        Some(rgb) if luminance(rgb) > CONTRAST_THRESHOLD => DARK_TEXT,
        _ => LIGHT_TEXT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("#FFFFFF", DARK_TEXT ; "white background")]
    #[test_case("#000000", LIGHT_TEXT ; "black background")]
    #[test_case("#ff9500", DARK_TEXT ; "orange background")]
    #[test_case("#1f3a93", LIGHT_TEXT ; "navy background")]
    #[test_case("rgba(255, 255, 0, 0.1)", DARK_TEXT ; "alpha ignored")]
    #[test_case("papayawhip", LIGHT_TEXT ; "named color")]
    #[test_case("#ffffff80", DARK_TEXT ; "hex alpha ignored")]
    #[test_case("#0008", LIGHT_TEXT ; "short hex alpha ignored")]
    fn test_contrasting_text_color(color: &str, expected: &str) {
        assert_eq!(contrasting_text_color(color), expected);
    }

    #[test]
    fn test_opacity_preserves_channels() {
        assert_eq!(with_opacity("#FF9500", 0.3), "rgba(255, 149, 0, 0.3)");
    }

    #[test]
    fn test_opacity_replaces_existing_alpha() {
        assert_eq!(with_opacity("rgba(1, 2, 3, 0.9)", 0.5), "rgba(1, 2, 3, 0.5)");
        assert_eq!(with_opacity("rgb(1,2,3)", 1.0), "rgba(1, 2, 3, 1)");
        assert_eq!(with_opacity("#ff950080", 0.3), "rgba(255, 149, 0, 0.3)");
    }

    #[test]
    fn test_unrecognised_color_falls_back_to_black() {
        assert_eq!(with_opacity("teal", 0.3), "rgba(0, 0, 0, 0.3)");
    }

    #[test]
    fn test_luminance_threshold_is_exclusive() {
        // 128 on every channel sits exactly on the threshold
        assert_eq!(luminance(Rgb::new(128, 128, 128)), 128.0);
        assert_eq!(contrasting_text_color("#808080"), LIGHT_TEXT);
    }
}
