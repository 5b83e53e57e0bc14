//! Cursor messages exchanged between peers.
//!
//! Messages are JSON, tagged by `type` like the rest of the collaboration
//! protocol. Transport is up to the host.

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::elements::{SlideId, UserId};

/// Cursor position in slide coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
}

impl From<Point> for CursorPosition {
    fn from(point: Point) -> Self {
        Self {
            x: point.x,
            y: point.y,
        }
    }
}

impl From<CursorPosition> for Point {
    fn from(position: CursorPosition) -> Self {
        Point::new(position.x, position.y)
    }
}

/// Display info of a cursor owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub color: String,
}

/// Who is sending cursor updates: one user may run several sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorIdentity {
    pub user_id: UserId,
    pub session_id: String,
    pub slide_id: SlideId,
}

/// Cursor update broadcast to every peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CursorMessage {
    /// Cursor moved
    Cursor {
        #[serde(flatten)]
        identity: CursorIdentity,
        position: CursorPosition,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        user: Option<UserInfo>,
    },
    /// Cursor left the slide
    CursorLeft {
        #[serde(flatten)]
        identity: CursorIdentity,
    },
}

impl CursorMessage {
    pub fn identity(&self) -> &CursorIdentity {
        match self {
            CursorMessage::Cursor { identity, .. } | CursorMessage::CursorLeft { identity } => {
                identity
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
