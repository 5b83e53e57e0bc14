//! Sparse field-level updates for elements.

use super::{
    Element, ElementId, PathEnd, PathKind, SerializableColor, ShapeKind, Stroke, TextContent,
};
use kurbo::Point;

/// Sparse update for an element. Only present fields are applied; fields that
/// do not exist on the target variant are ignored.
///
/// Clearable fields use `Option<Option<_>>`: `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPatch {
    pub position: Option<Point>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub shape_kind: Option<ShapeKind>,
    pub path_kind: Option<PathKind>,
    pub points: Option<Vec<Point>>,
    pub fill_color: Option<SerializableColor>,
    /// Path stroke color.
    pub stroke_color: Option<SerializableColor>,
    /// Shape outline.
    pub stroke: Option<Option<Stroke>>,
    pub text: Option<Option<TextContent>>,
    pub content_ref: Option<String>,
    pub file_name: Option<String>,
    pub connected_paths: Option<Vec<ElementId>>,
    pub connected_element_start: Option<Option<ElementId>>,
    pub connected_element_end: Option<Option<ElementId>>,
    pub attached_frame: Option<Option<ElementId>>,
    pub attached_elements: Option<Vec<ElementId>>,
}

impl ElementPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn points(mut self, points: Vec<Point>) -> Self {
        self.points = Some(points);
        self
    }

    pub fn fill_color(mut self, color: SerializableColor) -> Self {
        self.fill_color = Some(color);
        self
    }

    pub fn text(mut self, text: Option<TextContent>) -> Self {
        self.text = Some(text);
        self
    }

    pub fn connected_paths(mut self, paths: Vec<ElementId>) -> Self {
        self.connected_paths = Some(paths);
        self
    }

    /// Set or clear the connection at one path end.
    pub fn connection(mut self, end: PathEnd, shape_id: Option<ElementId>) -> Self {
        match end {
            PathEnd::Start => self.connected_element_start = Some(shape_id),
            PathEnd::End => self.connected_element_end = Some(shape_id),
        }
        self
    }

    pub fn attached_frame(mut self, frame_id: Option<ElementId>) -> Self {
        self.attached_frame = Some(frame_id);
        self
    }

    pub fn attached_elements(mut self, elements: Vec<ElementId>) -> Self {
        self.attached_elements = Some(elements);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the patch writes any relation field.
    pub fn touches_relations(&self) -> bool {
        self.connected_paths.is_some()
            || self.connected_element_start.is_some()
            || self.connected_element_end.is_some()
            || self.attached_frame.is_some()
            || self.attached_elements.is_some()
    }

    /// Fold `later` into `self`; fields present in `later` win.
    pub fn merge(&mut self, later: ElementPatch) {
        fn take<T>(slot: &mut Option<T>, later: Option<T>) {
            if later.is_some() {
                *slot = later;
            }
        }

        take(&mut self.position, later.position);
        take(&mut self.width, later.width);
        take(&mut self.height, later.height);
        take(&mut self.shape_kind, later.shape_kind);
        take(&mut self.path_kind, later.path_kind);
        take(&mut self.points, later.points);
        take(&mut self.fill_color, later.fill_color);
        take(&mut self.stroke_color, later.stroke_color);
        take(&mut self.stroke, later.stroke);
        take(&mut self.text, later.text);
        take(&mut self.content_ref, later.content_ref);
        take(&mut self.file_name, later.file_name);
        take(&mut self.connected_paths, later.connected_paths);
        take(&mut self.connected_element_start, later.connected_element_start);
        take(&mut self.connected_element_end, later.connected_element_end);
        take(&mut self.attached_frame, later.attached_frame);
        take(&mut self.attached_elements, later.attached_elements);
    }

    /// Apply the patch to an element in place.
    pub fn apply_to(&self, element: &mut Element) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }

        if let Some(position) = self.position {
            element.set_position(position);
        }

        match element {
            Element::Shape(s) => {
                set(&mut s.width, &self.width);
                set(&mut s.height, &self.height);
                set(&mut s.kind, &self.shape_kind);
                set(&mut s.fill_color, &self.fill_color);
                set(&mut s.stroke, &self.stroke);
                set(&mut s.text, &self.text);
                set(&mut s.connected_paths, &self.connected_paths);
                set(&mut s.attached_frame, &self.attached_frame);
            }
            Element::Path(p) => {
                set(&mut p.kind, &self.path_kind);
                set(&mut p.points, &self.points);
                set(&mut p.stroke_color, &self.stroke_color);
                set(&mut p.connected_element_start, &self.connected_element_start);
                set(&mut p.connected_element_end, &self.connected_element_end);
                set(&mut p.attached_frame, &self.attached_frame);
            }
            Element::Image(i) => {
                set(&mut i.width, &self.width);
                set(&mut i.height, &self.height);
                set(&mut i.content_ref, &self.content_ref);
                set(&mut i.file_name, &self.file_name);
                set(&mut i.attached_frame, &self.attached_frame);
            }
            Element::Frame(f) => {
                set(&mut f.width, &self.width);
                set(&mut f.height, &self.height);
                set(&mut f.attached_elements, &self.attached_elements);
            }
        }
    }
}
