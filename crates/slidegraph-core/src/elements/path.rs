//! Path element (lines and polylines).

use super::{ElementId, SerializableColor, generate_id};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Path geometry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    #[default]
    Line,
    Polyline,
}

impl PathKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathKind::Line => "line",
            PathKind::Polyline => "polyline",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "line" => Some(PathKind::Line),
            "polyline" => Some(PathKind::Polyline),
            _ => None,
        }
    }
}

/// One of the two connectable ends of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathEnd {
    Start,
    End,
}

impl PathEnd {
    pub const BOTH: [PathEnd; 2] = [PathEnd::Start, PathEnd::End];
}

/// A line or polyline whose ends may connect to shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub id: ElementId,
    pub kind: PathKind,
    /// Origin of the local point coordinates.
    pub position: Point,
    /// Points relative to `position`.
    pub points: Vec<Point>,
    pub stroke_color: SerializableColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_element_start: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_element_end: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_frame: Option<ElementId>,
}

impl Path {
    /// Create a new black path with no connections.
    pub fn new(kind: PathKind, position: Point, points: Vec<Point>) -> Self {
        Self {
            id: generate_id(),
            kind,
            position,
            points,
            stroke_color: SerializableColor::black(),
            connected_element_start: None,
            connected_element_end: None,
            attached_frame: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder helper to connect an end while constructing a path.
    pub fn connected(mut self, end: PathEnd, shape_id: impl Into<ElementId>) -> Self {
        *self.connection_mut(end) = Some(shape_id.into());
        self
    }

    /// Points in slide coordinates.
    pub fn absolute_points(&self) -> Vec<Point> {
        let origin = self.position.to_vec2();
        self.points.iter().map(|p| *p + origin).collect()
    }

    pub fn bounds(&self) -> Rect {
        let mut points = self.absolute_points().into_iter();
        let Some(first) = points.next() else {
            return Rect::from_points(self.position, self.position);
        };
        points.fold(Rect::from_points(first, first), |rect, p| rect.union_pt(p))
    }

    /// Shape connected at `end`, if any.
    pub fn connection(&self, end: PathEnd) -> Option<&ElementId> {
        match end {
            PathEnd::Start => self.connected_element_start.as_ref(),
            PathEnd::End => self.connected_element_end.as_ref(),
        }
    }

    pub(crate) fn connection_mut(&mut self, end: PathEnd) -> &mut Option<ElementId> {
        match end {
            PathEnd::Start => &mut self.connected_element_start,
            PathEnd::End => &mut self.connected_element_end,
        }
    }

    /// Whether either end references `shape_id`.
    pub fn is_connected_to(&self, shape_id: &str) -> bool {
        PathEnd::BOTH
            .iter()
            .any(|end| self.connection(*end).is_some_and(|id| id == shape_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_points_and_bounds() {
        let path = Path::new(
            PathKind::Polyline,
            Point::new(10.0, 10.0),
            vec![Point::new(0.0, 0.0), Point::new(5.0, -5.0), Point::new(20.0, 3.0)],
        );
        assert_eq!(
            path.absolute_points(),
            vec![Point::new(10.0, 10.0), Point::new(15.0, 5.0), Point::new(30.0, 13.0)]
        );
        assert_eq!(path.bounds(), Rect::new(10.0, 5.0, 30.0, 13.0));
    }

    #[test]
    fn test_empty_path_bounds_collapse_to_position() {
        let path = Path::new(PathKind::Line, Point::new(3.0, 4.0), Vec::new());
        assert_eq!(path.bounds(), Rect::new(3.0, 4.0, 3.0, 4.0));
    }

    #[test]
    fn test_connection_accessors() {
        let path = Path::new(PathKind::Line, Point::ZERO, vec![])
            .connected(PathEnd::Start, "s1")
            .connected(PathEnd::End, "s2");
        assert_eq!(path.connection(PathEnd::Start).map(String::as_str), Some("s1"));
        assert!(path.is_connected_to("s2"));
        assert!(!path.is_connected_to("s3"));
    }
}
