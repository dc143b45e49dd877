//! On-page watermark: lifecycle, positioning and drag
//!
//! The overlay owns exactly one label element through an [`OverlaySurface`]
//! and the [`PositionCache`] that remembers where the user left it. Its life
//! cycle is absent -> visible -> (updated in place)* -> absent. A surface
//! that got detached behind our back counts as absent, so the next render
//! recreates it.

pub mod drag;
pub mod position;

use crate::config::OverlayConfig;
use crate::models::{GlobalSettings, ResolvedDisplayState};

pub use drag::DragSession;
pub use position::{
    clamp_to_viewport, clamp_within, default_position, restore_saved, MemoryPositionCache, Position,
    PositionCache, Size, Viewport,
};

/// Everything the surface needs to paint the label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkStyle {
    pub text: String,
    pub background: String,
    pub color: String,
    pub font_size_px: u32,
    pub z_index: u32,
}

impl WatermarkStyle {
    pub fn new(state: &ResolvedDisplayState, globals: &GlobalSettings, config: &OverlayConfig) -> Self {
        Self {
            text: state.display_name.clone(),
            background: state.background_color.clone(),
            color: state.text_color.clone(),
            font_size_px: globals.watermark_size,
            z_index: config.z_index,
        }
    }

    /// Inline style for a freshly created element
    pub fn css_text(&self, position: Position) -> String {
        format!(
            "position: fixed; background: {}; color: {}; padding: 12px 16px; border-radius: 6px; \
             font-size: {}px; font-weight: bold; z-index: {}; pointer-events: auto; \
             user-select: none; font-family: Arial, sans-serif; left: {}px; top: {}px; \
             cursor: move; box-shadow: 0 2px 8px rgba(0,0,0,0.2);",
            self.background, self.color, self.font_size_px, self.z_index, position.x, position.y
        )
    }
}

/// The host element the watermark is drawn into
pub trait OverlaySurface {
    fn is_attached(&self) -> bool;
    fn mount(&mut self, style: &WatermarkStyle, position: Position);
    /// Refresh text and colors, keeping the current position
    fn restyle(&mut self, style: &WatermarkStyle);
    fn move_to(&mut self, position: Position);
    fn unmount(&mut self);
    /// Rendered size of the mounted element
    fn element_size(&self) -> Size;
}

/// What a render call did to the element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayChange {
    Created,
    Updated,
    Removed,
    Unchanged,
}

pub struct WatermarkOverlay<S, C> {
    surface: S,
    cache: C,
    config: OverlayConfig,
    viewport: Viewport,
    position: Option<Position>,
    drag: Option<DragSession>,
}

impl<S: OverlaySurface, C: PositionCache> WatermarkOverlay<S, C> {
    pub fn new(surface: S, cache: C, config: OverlayConfig, viewport: Viewport) -> Self {
        Self {
            surface,
            cache,
            config,
            viewport,
            position: None,
            drag: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.surface.is_attached()
    }

    pub fn position(&self) -> Option<Position> {
        self.position.filter(|_| self.surface.is_attached())
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Bring the element in line with the resolved state. A `Created`
    /// result should be followed by [`adjust`](Self::adjust) once the
    /// element has been laid out.
    pub fn render(&mut self, state: &ResolvedDisplayState, globals: &GlobalSettings) -> OverlayChange {
        if !globals.enable_watermark {
            return self.remove();
        }

        let style = WatermarkStyle::new(state, globals, &self.config);
        if self.surface.is_attached() {
            self.surface.restyle(&style);
            tracing::debug!(text = %style.text, "watermark updated");
            return OverlayChange::Updated;
        }

        let position = self.initial_position();
        self.surface.mount(&style, position);
        self.position = Some(position);
        self.drag = None;
        tracing::debug!(text = %style.text, x = position.x, y = position.y, "watermark created");
        OverlayChange::Created
    }

    pub fn remove(&mut self) -> OverlayChange {
        self.drag = None;
        if !self.surface.is_attached() {
            self.position = None;
            return OverlayChange::Unchanged;
        }
        self.surface.unmount();
        self.position = None;
        tracing::debug!("watermark removed");
        OverlayChange::Removed
    }

    fn initial_position(&self) -> Position {
        match self.cache.load() {
            Ok(Some(saved)) => restore_saved(saved, self.viewport, &self.config),
            Ok(None) => default_position(self.viewport, &self.config),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read watermark position");
                default_position(self.viewport, &self.config)
            }
        }
    }

    /// Record a new viewport size. Callers debounce resize bursts and then
    /// call [`adjust`](Self::adjust).
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Clamp the mounted element inside the viewport margin, persisting the
    /// position when it moved. Returns the new position if it changed.
    pub fn adjust(&mut self) -> Option<Position> {
        if !self.surface.is_attached() {
            return None;
        }
        let current = self.position?;
        let adjusted = clamp_within(
            current,
            self.viewport,
            self.surface.element_size(),
            self.config.margin,
        );
        if adjusted == current {
            return None;
        }

        self.surface.move_to(adjusted);
        self.position = Some(adjusted);
        self.persist(adjusted);
        Some(adjusted)
    }

    pub fn pointer_down(&mut self, pointer: Position) -> bool {
        if !self.surface.is_attached() {
            return false;
        }
        let Some(origin) = self.position else {
            return false;
        };
        self.drag = Some(DragSession::begin(pointer, origin));
        true
    }

    pub fn pointer_move(&mut self, pointer: Position) -> Option<Position> {
        let session = self.drag?;
        if !self.surface.is_attached() {
            self.drag = None;
            return None;
        }
        let target = session.target(pointer, self.viewport, self.surface.element_size());
        self.surface.move_to(target);
        self.position = Some(target);
        Some(target)
    }

    /// End the drag and save where the element was dropped
    pub fn pointer_up(&mut self) -> Option<Position> {
        self.drag.take()?;
        let position = self.position?;
        self.persist(position);
        Some(position)
    }

    fn persist(&mut self, position: Position) {
        if let Err(e) = self.cache.save(position) {
            tracing::warn!(error = %e, "failed to save watermark position");
        }
    }
}
