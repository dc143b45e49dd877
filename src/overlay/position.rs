//! Watermark geometry and the per-browser position cache

use crate::config::OverlayConfig;
use crate::error::{IndicatorError, Result};
use serde::{Deserialize, Serialize};

/// Top-left corner of the watermark, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset_from(self, origin: Position) -> Position {
        Position::new(self.x - origin.x, self.y - origin.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Visible area of the page
pub type Viewport = Size;

fn clamp_axis(value: i32, min: i32, max: i32) -> i32 {
    // `max` may fall below `min` on tiny viewports; the lower bound wins
    value.min(max).max(min)
}

/// Bottom-right corner, never closer than the margin to the top-left
pub fn default_position(viewport: Viewport, config: &OverlayConfig) -> Position {
    Position::new(
        (viewport.width - config.default_offset_x).max(config.margin),
        (viewport.height - config.default_offset_y).max(config.margin),
    )
}

/// Pull a cached position back on screen before the element exists,
/// assuming the estimated watermark size
pub fn restore_saved(saved: Position, viewport: Viewport, config: &OverlayConfig) -> Position {
    let estimated = Size::new(config.estimated_width, config.estimated_height);
    clamp_within(saved, viewport, estimated, config.margin)
}

/// Keep the whole element inside `[margin, viewport - element - margin]`
pub fn clamp_within(position: Position, viewport: Viewport, element: Size, margin: i32) -> Position {
    Position::new(
        clamp_axis(position.x, margin, viewport.width - element.width - margin),
        clamp_axis(position.y, margin, viewport.height - element.height - margin),
    )
}

/// Drag bounds: the element may touch the viewport edge
pub fn clamp_to_viewport(position: Position, viewport: Viewport, element: Size) -> Position {
    clamp_within(position, viewport, element, 0)
}

/// Storage for the last watermark position. Independent of the settings
/// store and shared by every account.
pub trait PositionCache {
    fn load(&self) -> Result<Option<Position>>;
    fn save(&mut self, position: Position) -> Result<()>;
}

/// Decode the cached `{"x":..,"y":..}` value
pub fn decode_position(raw: &str) -> Result<Position> {
    serde_json::from_str(raw).map_err(|e| IndicatorError::PositionCache(e.to_string()))
}

pub fn encode_position(position: Position) -> Result<String> {
    serde_json::to_string(&position).map_err(|e| IndicatorError::PositionCache(e.to_string()))
}

#[derive(Debug, Default)]
pub struct MemoryPositionCache {
    position: Option<Position>,
    failing: bool,
    writes: usize,
}

impl MemoryPositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// A cache whose reads and writes all fail
    pub fn unavailable() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PositionCache for MemoryPositionCache {
    fn load(&self) -> Result<Option<Position>> {
        if self.failing {
            return Err(IndicatorError::PositionCache("cache unavailable".into()));
        }
        Ok(self.position)
    }

    fn save(&mut self, position: Position) -> Result<()> {
        if self.failing {
            return Err(IndicatorError::PositionCache("cache unavailable".into()));
        }
        self.position = Some(position);
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Size::new(1280, 800), Position::new(1070, 690) ; "desktop")]
    #[test_case(Size::new(150, 90), Position::new(10, 10) ; "tiny viewport")]
    fn test_default_position(viewport: Viewport, expected: Position) {
        assert_eq!(default_position(viewport, &OverlayConfig::default()), expected);
    }

    #[test]
    fn test_restore_saved_uses_estimated_box() {
        let config = OverlayConfig::default();
        let viewport = Size::new(1000, 600);
        assert_eq!(
            restore_saved(Position::new(5000, -20), viewport, &config),
            Position::new(790, 10)
        );
        assert_eq!(
            restore_saved(Position::new(300, 200), viewport, &config),
            Position::new(300, 200)
        );
    }

    #[test]
    fn test_clamp_within_margin() {
        let clamped = clamp_within(
            Position::new(990, 590),
            Size::new(1000, 600),
            Size::new(180, 60),
            10,
        );
        assert_eq!(clamped, Position::new(810, 530));
    }

    #[test]
    fn test_clamp_to_viewport_allows_edges() {
        let viewport = Size::new(800, 600);
        let element = Size::new(100, 50);
        assert_eq!(
            clamp_to_viewport(Position::new(-40, 900), viewport, element),
            Position::new(0, 550)
        );
    }

    #[test]
    fn test_position_cache_format() {
        assert_eq!(encode_position(Position::new(12, 34)).unwrap(), r#"{"x":12,"y":34}"#);
        assert_eq!(decode_position(r#"{"x":5,"y":6}"#).unwrap(), Position::new(5, 6));
        assert!(matches!(
            decode_position("not json"),
            Err(IndicatorError::PositionCache(_))
        ));
    }
}
