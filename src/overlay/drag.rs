//! Pointer drag tracking for the watermark

use super::position::{clamp_to_viewport, Position, Size, Viewport};

/// An active drag. Holds the pointer offset from the element origin taken at
/// pointer-down so the element does not jump under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    offset: Position,
}

impl DragSession {
    pub fn begin(pointer: Position, origin: Position) -> Self {
        Self {
            offset: pointer.offset_from(origin),
        }
    }

    pub fn offset(&self) -> Position {
        self.offset
    }

    /// Where the element goes for the given pointer, kept inside the viewport
    pub fn target(&self, pointer: Position, viewport: Viewport, element: Size) -> Position {
        clamp_to_viewport(pointer.offset_from(self.offset), viewport, element)
    }
}
