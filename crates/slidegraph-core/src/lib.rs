//! SlideGraph Core Library
//!
//! Element relationship and slide mutation engine for a collaborative
//! whiteboard. Slides live in a replicated document; every mutation keeps
//! path connections and frame attachments consistent on both sides.

pub mod config;
pub mod crdt;
pub mod cursor;
pub mod elements;
pub mod error;
mod observe;
pub mod relations;
pub mod selection;
pub mod slide;
pub mod store;
pub mod sync;

pub use config::EngineConfig;
pub use crdt::{
    ChangeEvent, ChangeOrigin, LoroDocument, MemoryDocument, ReplicatedDocument, SlideData,
    Transaction,
};
pub use cursor::{CursorBroadcaster, CursorThrottle, RemoteCursors};
pub use elements::{
    BoundingRect, Element, ElementId, ElementPatch, Frame, Image, Path, PathEnd, PathKind, Shape,
    ShapeKind, SlideId, UserId,
};
pub use error::{DocumentError, SlideError, SlideResult};
pub use selection::SelectionState;
pub use slide::SlideInstance;
pub use store::ElementStore;
pub use sync::{CursorIdentity, CursorMessage, CursorPosition, UserInfo};
