//! CSS color parsing for the formats stored in account/role configs

use crate::models::Rgb;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RGB_FUNCTION_REGEX: Regex =
        Regex::new(r"rgba?\((\d+),\s*(\d+),\s*(\d+)(?:,\s*([\d.]+))?\)").unwrap();
}

/// Parse `#rrggbb`, `#rrggbbaa`, `#rgb`, `#rgba`, `rgb(r, g, b)` or
/// `rgba(r, g, b, a)`. The alpha channel, if any, is dropped.
pub fn parse_color(input: &str) -> Option<Rgb> {
    let input = input.trim();

    if let Some(hex) = input.strip_prefix('#') {
        return parse_hex(hex);
    }

    if input.starts_with("rgb") {
        let caps = RGB_FUNCTION_REGEX.captures(input)?;
        let channel = |i: usize| -> Option<u8> {
            let value: u32 = caps.get(i)?.as_str().parse().ok()?;
            Some(value.min(255) as u8)
        };
        return Some(Rgb::new(channel(1)?, channel(2)?, channel(3)?));
    }

    None
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        6 | 8 => {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
        }
        3 | 4 => {
            let channel = |i: usize| {
                u8::from_str_radix(&hex[i..i + 1], 16)
                    .ok()
                    .map(|v| v * 17)
            };
            Some(Rgb::new(channel(0)?, channel(1)?, channel(2)?))
        }
        _ => None,
    }
}
