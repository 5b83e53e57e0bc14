//! Element definitions for slides.
//!
//! An [`Element`] is one drawable unit on a slide. Relations between elements
//! (path to shape connections, element to frame attachments) are stored as
//! plain ids on both sides and resolved through the element store at use time.

mod frame;
mod image;
mod patch;
mod path;
mod shape;

pub use frame::Frame;
pub use image::Image;
pub use patch::ElementPatch;
pub use path::{Path, PathEnd, PathKind};
pub use shape::{Shape, ShapeKind, Stroke, TextAlign, TextContent};

use kurbo::{Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for elements.
pub type ElementId = String;
/// Unique identifier for slides.
pub type SlideId = String;
/// Unique identifier for users (lock holders, cursor owners).
pub type UserId = String;

/// Generate a fresh element id.
pub fn generate_id() -> ElementId {
    Uuid::new_v4().to_string()
}

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Format as `#rrggbbaa`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, 255)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::black()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Axis-aligned bounds derived from one or more elements. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingRect {
    pub offset_x: f64,
    pub offset_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingRect {
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            offset_x: rect.x0,
            offset_y: rect.y0,
            width: rect.width(),
            height: rect.height(),
        }
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            self.offset_x,
            self.offset_y,
            self.offset_x + self.width,
            self.offset_y + self.height,
        )
    }

    /// Union of the bounds of every element, or `None` for an empty input.
    pub fn of_elements<'a>(elements: impl IntoIterator<Item = &'a Element>) -> Option<Self> {
        elements
            .into_iter()
            .map(Element::bounds)
            .reduce(|acc, rect| acc.union(rect))
            .map(Self::from_rect)
    }
}

/// Tagged union over every drawable element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Shape(Shape),
    Path(Path),
    Image(Image),
    Frame(Frame),
}

impl Element {
    pub fn id(&self) -> &ElementId {
        match self {
            Element::Shape(s) => &s.id,
            Element::Path(p) => &p.id,
            Element::Image(i) => &i.id,
            Element::Frame(f) => &f.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: ElementId) {
        match self {
            Element::Shape(s) => s.id = id,
            Element::Path(p) => p.id = id,
            Element::Image(i) => i.id = id,
            Element::Frame(f) => f.id = id,
        }
    }

    /// Variant name as stored in the document.
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::Shape(_) => "shape",
            Element::Path(_) => "path",
            Element::Image(_) => "image",
            Element::Frame(_) => "frame",
        }
    }

    pub fn position(&self) -> Point {
        match self {
            Element::Shape(s) => s.position,
            Element::Path(p) => p.position,
            Element::Image(i) => i.position,
            Element::Frame(f) => f.position,
        }
    }

    pub fn set_position(&mut self, position: Point) {
        match self {
            Element::Shape(s) => s.position = position,
            Element::Path(p) => p.position = position,
            Element::Image(i) => i.position = position,
            Element::Frame(f) => f.position = position,
        }
    }

    /// Move the element by `offset`. Path points are local, so only the
    /// position changes.
    pub fn translate(&mut self, offset: Vec2) {
        let position = self.position() + offset;
        self.set_position(position);
    }

    /// Bounding box in slide coordinates.
    pub fn bounds(&self) -> Rect {
        match self {
            Element::Shape(s) => s.bounds(),
            Element::Path(p) => p.bounds(),
            Element::Image(i) => i.bounds(),
            Element::Frame(f) => f.bounds(),
        }
    }

    pub fn is_frame(&self) -> bool {
        matches!(self, Element::Frame(_))
    }

    /// Frames are the only elements that cannot be attached to a frame.
    pub fn is_attachable(&self) -> bool {
        !self.is_frame()
    }

    pub fn as_shape(&self) -> Option<&Shape> {
        match self {
            Element::Shape(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Element::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Element::Image(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Element::Frame(f) => Some(f),
            _ => None,
        }
    }

    /// Frame this element is attached to, if any.
    pub fn attached_frame(&self) -> Option<&ElementId> {
        match self {
            Element::Shape(s) => s.attached_frame.as_ref(),
            Element::Path(p) => p.attached_frame.as_ref(),
            Element::Image(i) => i.attached_frame.as_ref(),
            Element::Frame(_) => None,
        }
    }

    /// Every id this element references through a relation field, in field
    /// order. Duplicates are kept.
    pub fn relation_targets(&self) -> Vec<ElementId> {
        let mut targets = Vec::new();
        match self {
            Element::Shape(s) => {
                targets.extend(s.connected_paths.iter().cloned());
                targets.extend(s.attached_frame.iter().cloned());
            }
            Element::Path(p) => {
                targets.extend(p.connected_element_start.iter().cloned());
                targets.extend(p.connected_element_end.iter().cloned());
                targets.extend(p.attached_frame.iter().cloned());
            }
            Element::Image(i) => targets.extend(i.attached_frame.iter().cloned()),
            Element::Frame(f) => targets.extend(f.attached_elements.iter().cloned()),
        }
        targets
    }

    /// Drop every relation field.
    pub fn strip_relations(&mut self) {
        self.rewrite_relations(|_| None);
    }

    /// Map every relation id through `f`; `None` drops the reference.
    pub fn rewrite_relations(&mut self, mut f: impl FnMut(&ElementId) -> Option<ElementId>) {
        fn rewrite_one(
            slot: &mut Option<ElementId>,
            f: &mut impl FnMut(&ElementId) -> Option<ElementId>,
        ) {
            *slot = slot.as_ref().and_then(|id| f(id));
        }
        fn rewrite_list(list: &mut Vec<ElementId>, f: &mut impl FnMut(&ElementId) -> Option<ElementId>) {
            *list = list.iter().filter_map(|id| f(id)).collect();
        }

        match self {
            Element::Shape(s) => {
                rewrite_list(&mut s.connected_paths, &mut f);
                rewrite_one(&mut s.attached_frame, &mut f);
            }
            Element::Path(p) => {
                rewrite_one(&mut p.connected_element_start, &mut f);
                rewrite_one(&mut p.connected_element_end, &mut f);
                rewrite_one(&mut p.attached_frame, &mut f);
            }
            Element::Image(i) => rewrite_one(&mut i.attached_frame, &mut f),
            Element::Frame(fr) => rewrite_list(&mut fr.attached_elements, &mut f),
        }
    }
}

impl From<Shape> for Element {
    fn from(shape: Shape) -> Self {
        Element::Shape(shape)
    }
}

impl From<Path> for Element {
    fn from(path: Path) -> Self {
        Element::Path(path)
    }
}

impl From<Image> for Element {
    fn from(image: Image) -> Self {
        Element::Image(image)
    }
}

impl From<Frame> for Element {
    fn from(frame: Frame) -> Self {
        Element::Frame(frame)
    }
}

/// Rectangle anchored at `position`, normalized for negative sizes.
pub(crate) fn sized_rect(position: Point, width: f64, height: f64) -> Rect {
    Rect::new(position.x, position.y, position.x + width, position.y + height).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_roundtrip() {
        let color = SerializableColor::new(0x12, 0xab, 0x00, 0x80);
        assert_eq!(color.to_hex(), "#12ab0080");
        assert_eq!(SerializableColor::from_hex("#12ab0080"), Some(color));
        assert_eq!(
            SerializableColor::from_hex("ffffff"),
            Some(SerializableColor::white())
        );
        assert_eq!(SerializableColor::from_hex("#fff"), None);
        assert_eq!(SerializableColor::from_hex("#gg0000"), None);
    }

    #[test]
    fn test_bounding_rect_of_mixed_elements() {
        let rect = Element::from(Shape::new(ShapeKind::Rectangle, Point::new(10.0, 10.0), 20.0, 20.0));
        let line = Element::from(Path::new(
            PathKind::Polyline,
            Point::new(100.0, 0.0),
            vec![Point::new(0.0, 0.0), Point::new(-20.0, 50.0), Point::new(10.0, 5.0)],
        ));

        let bounds = BoundingRect::of_elements([&rect, &line]).unwrap();
        assert_eq!(bounds.offset_x, 10.0);
        assert_eq!(bounds.offset_y, 0.0);
        assert_eq!(bounds.width, 100.0);
        assert_eq!(bounds.height, 50.0);
        assert!(BoundingRect::of_elements(std::iter::empty()).is_none());
    }

    #[test]
    fn test_relation_targets_keep_duplicates() {
        let mut shape = Shape::new(ShapeKind::Circle, Point::ZERO, 10.0, 10.0);
        shape.connected_paths = vec!["p1".into(), "p1".into()];
        shape.attached_frame = Some("f1".into());
        let element = Element::from(shape);
        assert_eq!(element.relation_targets(), vec!["p1", "p1", "f1"]);
    }

    #[test]
    fn test_rewrite_relations_drops_unmapped() {
        let mut path = Path::new(PathKind::Line, Point::ZERO, vec![Point::ZERO, Point::new(5.0, 5.0)]);
        path.connected_element_start = Some("a".into());
        path.connected_element_end = Some("b".into());
        let mut element = Element::from(path);

        element.rewrite_relations(|id| (id == "a").then(|| "a2".to_string()));

        let path = element.as_path().unwrap();
        assert_eq!(path.connected_element_start.as_deref(), Some("a2"));
        assert_eq!(path.connected_element_end, None);
    }

    #[test]
    fn test_frames_are_not_attachable() {
        let frame = Element::from(Frame::new(Point::ZERO, 100.0, 100.0));
        assert!(!frame.is_attachable());
        assert!(frame.attached_frame().is_none());
    }

    #[test]
    fn test_element_json_is_tagged() {
        let element = Element::from(Image::new(Point::new(1.0, 2.0), 3.0, 4.0, "blob:1", "cat.png"));
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(json["type"], "image");
        let back: Element = serde_json::from_value(json).unwrap();
        assert_eq!(back, element);
    }
}
