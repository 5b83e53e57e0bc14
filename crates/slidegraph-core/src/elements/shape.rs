//! Shape element.

use super::{ElementId, SerializableColor, generate_id, sized_rect};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Geometric kind of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Circle,
    Ellipse,
    Triangle,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Triangle => "triangle",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rectangle" => Some(ShapeKind::Rectangle),
            "circle" => Some(ShapeKind::Circle),
            "ellipse" => Some(ShapeKind::Ellipse),
            "triangle" => Some(ShapeKind::Triangle),
            _ => None,
        }
    }
}

/// Outline of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: SerializableColor,
    pub width: f64,
}

/// Horizontal text alignment inside a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            _ => None,
        }
    }
}

/// Text rendered inside a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default)]
    pub color: SerializableColor,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default = "default_text_size")]
    pub size: f64,
}

fn default_text_size() -> f64 {
    16.0
}

impl TextContent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            align: TextAlign::default(),
            color: SerializableColor::black(),
            bold: false,
            italic: false,
            size: default_text_size(),
        }
    }
}

/// A filled geometric shape that paths can connect to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ElementId,
    pub kind: ShapeKind,
    /// Top-left corner.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub fill_color: SerializableColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    /// Paths connected to this shape. A path connected at both ends appears twice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connected_paths: Vec<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_frame: Option<ElementId>,
}

impl Shape {
    /// Create a new shape with a white fill and no relations.
    pub fn new(kind: ShapeKind, position: Point, width: f64, height: f64) -> Self {
        Self {
            id: generate_id(),
            kind,
            position,
            width,
            height,
            fill_color: SerializableColor::white(),
            stroke: None,
            text: None,
            connected_paths: Vec::new(),
            attached_frame: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_fill(mut self, color: SerializableColor) -> Self {
        self.fill_color = color;
        self
    }

    pub fn with_stroke(mut self, color: SerializableColor, width: f64) -> Self {
        self.stroke = Some(Stroke { color, width });
        self
    }

    pub fn with_text(mut self, text: TextContent) -> Self {
        self.text = Some(text);
        self
    }

    pub fn bounds(&self) -> Rect {
        sized_rect(self.position, self.width, self.height)
    }

    /// Number of times `path_id` appears in `connected_paths`.
    pub fn connection_count(&self, path_id: &str) -> usize {
        self.connected_paths.iter().filter(|id| *id == path_id).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_creation() {
        let shape = Shape::new(ShapeKind::Triangle, Point::new(10.0, 20.0), 30.0, 40.0)
            .with_text(TextContent::new("hello"));
        assert_eq!(shape.kind, ShapeKind::Triangle);
        assert_eq!(shape.bounds(), Rect::new(10.0, 20.0, 40.0, 60.0));
        assert_eq!(shape.text.as_ref().unwrap().align, TextAlign::Center);
        assert!(!shape.id.is_empty());
    }

    #[test]
    fn test_negative_size_bounds_are_normalized() {
        let shape = Shape::new(ShapeKind::Rectangle, Point::new(50.0, 50.0), -20.0, -10.0);
        assert_eq!(shape.bounds(), Rect::new(30.0, 40.0, 50.0, 50.0));
    }

    #[test]
    fn test_connection_count() {
        let mut shape = Shape::new(ShapeKind::Circle, Point::ZERO, 1.0, 1.0);
        shape.connected_paths = vec!["p".into(), "q".into(), "p".into()];
        assert_eq!(shape.connection_count("p"), 2);
        assert_eq!(shape.connection_count("z"), 0);
    }

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in [ShapeKind::Rectangle, ShapeKind::Circle, ShapeKind::Ellipse, ShapeKind::Triangle] {
            assert_eq!(ShapeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TextAlign::parse("right"), Some(TextAlign::Right));
        assert_eq!(TextAlign::parse("justify"), None);
    }
}
