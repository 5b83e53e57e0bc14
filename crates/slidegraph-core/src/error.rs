//! Error types.

use crate::elements::{SlideId, UserId};
use thiserror::Error;

/// Errors raised by a replicated document backend.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("CRDT error: {0}")]
    Loro(#[from] loro::LoroError),
    #[error("Export failed: {0}")]
    Export(String),
    #[error("Corrupt document: {0}")]
    Corrupt(String),
}

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors surfaced to callers of a slide instance.
///
/// Dangling references and unknown ids are corrected silently and never
/// appear here.
#[derive(Debug, Error)]
pub enum SlideError {
    #[error("Slide {slide_id} is locked by {holder}")]
    SlideLocked { slide_id: SlideId, holder: UserId },
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Result type for slide operations.
pub type SlideResult<T> = Result<T, SlideError>;
