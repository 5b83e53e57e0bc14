//! Image element.

use super::{ElementId, generate_id, sized_rect};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A raster image referenced by content id; the bytes live outside the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ElementId,
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Reference to the stored image content.
    pub content_ref: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_frame: Option<ElementId>,
}

impl Image {
    pub fn new(
        position: Point,
        width: f64,
        height: f64,
        content_ref: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id(),
            position,
            width,
            height,
            content_ref: content_ref.into(),
            file_name: file_name.into(),
            attached_frame: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn bounds(&self) -> Rect {
        sized_rect(self.position, self.width, self.height)
    }
}
