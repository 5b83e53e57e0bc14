//! Frame element for grouping attached elements.

use super::{ElementId, generate_id, sized_rect};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A container that other elements attach to. Frames never attach to frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: ElementId,
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Attached element ids, each at most once, in attachment order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attached_elements: Vec<ElementId>,
}

impl Frame {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: generate_id(),
            position,
            width,
            height,
            attached_elements: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn bounds(&self) -> Rect {
        sized_rect(self.position, self.width, self.height)
    }

    /// Whether both extreme corners of `rect` lie inside the frame (edges inclusive).
    pub fn contains_rect(&self, rect: Rect) -> bool {
        let frame = self.bounds();
        let inside = |x: f64, y: f64| x >= frame.x0 && x <= frame.x1 && y >= frame.y0 && y <= frame.y1;
        inside(rect.x0, rect.y0) && inside(rect.x1, rect.y1)
    }

    pub fn is_attached(&self, element_id: &str) -> bool {
        self.attached_elements.iter().any(|id| id == element_id)
    }
}
