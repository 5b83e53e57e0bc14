//! Replicated document contract and its backends.
//!
//! The slide engine never talks to a CRDT directly. It builds a [`Transaction`]
//! of element-level operations, hands it to a [`ReplicatedDocument`], and
//! reacts to the [`ChangeEvent`]s the document emits for every committed
//! change, local or remote.
//!
//! # Loro schema
//!
//! ```text
//! LoroDoc
//! ├── "elements:<slide>": LoroMap<ElementId, LoroMap> (element fields)
//! ├── "order:<slide>": LoroList<String> (element ids, back to front)
//! └── "locks": LoroMap<SlideId, String> (lock holder per slide)
//! ```
//!
//! Each element map holds `"type"` plus its variant fields. List fields
//! (points, connected paths, attached elements) are nested `LoroList`s.

mod convert;
mod memory;
mod schema;

pub use memory::MemoryDocument;
pub use schema::{ELEMENTS_PREFIX, LOCKS_KEY, LoroDocument, ORDER_PREFIX};

// Re-export Loro types needed to exchange updates between replicas
pub use loro::{ExportMode, VersionVector};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::elements::{Element, ElementId, ElementPatch, SlideId, UserId, generate_id};
use crate::error::DocumentResult;

/// One element-level operation inside a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOp {
    /// Insert (or overwrite) an element and append it to the paint order.
    InsertElement(Element),
    /// Apply a sparse patch. Skipped when the element no longer exists.
    PatchElement { id: ElementId, patch: ElementPatch },
    /// Delete an element and drop it from the paint order.
    RemoveElement(ElementId),
    /// Rewrite the paint order. Ids present in the document but missing from
    /// `order` keep their relative order after the listed ones.
    Reorder(Vec<ElementId>),
    /// Set or clear the slide lock.
    SetLock(Option<UserId>),
}

/// A batch of operations on one slide, applied atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub slide_id: SlideId,
    pub ops: Vec<DocumentOp>,
}

impl Transaction {
    pub fn new(slide_id: impl Into<SlideId>) -> Self {
        Self {
            slide_id: slide_id.into(),
            ops: Vec::new(),
        }
    }

    pub fn insert(&mut self, element: Element) -> &mut Self {
        self.ops.push(DocumentOp::InsertElement(element));
        self
    }

    /// Queue a patch; empty patches are dropped.
    pub fn patch(&mut self, id: impl Into<ElementId>, patch: ElementPatch) -> &mut Self {
        if !patch.is_empty() {
            self.ops.push(DocumentOp::PatchElement {
                id: id.into(),
                patch,
            });
        }
        self
    }

    pub fn remove(&mut self, id: impl Into<ElementId>) -> &mut Self {
        self.ops.push(DocumentOp::RemoveElement(id.into()));
        self
    }

    pub fn reorder(&mut self, order: Vec<ElementId>) -> &mut Self {
        self.ops.push(DocumentOp::Reorder(order));
        self
    }

    pub fn set_lock(&mut self, holder: Option<UserId>) -> &mut Self {
        self.ops.push(DocumentOp::SetLock(holder));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Raw materialized state of one slide, as stored. May contain dangling
/// references and order entries without elements; the element store
/// normalizes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideData {
    pub elements: HashMap<ElementId, Element>,
    pub order: Vec<ElementId>,
    pub lock: Option<UserId>,
}

/// Where a committed change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    Local,
    Remote,
    Undo,
    Redo,
}

/// Emitted once per committed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub origin: ChangeOrigin,
}

/// Metadata recorded with an undo step: the selection active at edit time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoContext {
    pub current_slide_id: SlideId,
    pub current_element_ids: Vec<ElementId>,
}

/// The replicated key/value document the slide engine is built on.
///
/// All methods take `&self`; implementations serialize local transactions
/// internally. Single-threaded use is assumed.
pub trait ReplicatedDocument {
    /// Apply every operation of `txn` as one atomic change.
    fn perform_change(&self, txn: Transaction) -> DocumentResult<()>;

    /// Current materialized state of a slide.
    fn get_data(&self, slide_id: &str) -> SlideData;

    /// Subscribe to committed changes.
    fn observe_changes(&self) -> broadcast::Receiver<ChangeEvent>;

    /// Attach `context` to the next undo step.
    fn set_undo_context(&self, context: UndoContext);

    /// Undo the last local step. Returns its recorded context, or `None`
    /// when there is nothing to undo.
    fn undo(&self) -> DocumentResult<Option<UndoContext>>;

    /// Redo the last undone step.
    fn redo(&self) -> DocumentResult<Option<UndoContext>>;

    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    /// Assign a fresh element id.
    fn generate_id(&self) -> ElementId {
        generate_id()
    }
}

/// Final paint order after a reorder: listed ids that exist, then the
/// remaining current ids in their existing order.
pub(crate) fn merge_order(
    current: &[ElementId],
    requested: &[ElementId],
    exists: impl Fn(&ElementId) -> bool,
) -> Vec<ElementId> {
    let mut order: Vec<ElementId> = Vec::with_capacity(current.len());
    for id in requested.iter().chain(current) {
        if exists(id) && !order.contains(id) {
            order.push(id.clone());
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<ElementId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_merge_order_keeps_unlisted_ids() {
        let current = ids(&["a", "b", "c", "d"]);
        let order = merge_order(&current, &ids(&["c", "a"]), |_| true);
        assert_eq!(order, ids(&["c", "a", "b", "d"]));
    }

    #[test]
    fn test_merge_order_drops_missing_and_duplicates() {
        let current = ids(&["a", "b", "b"]);
        let order = merge_order(&current, &ids(&["ghost", "b"]), |id| id != "ghost");
        assert_eq!(order, ids(&["b", "a"]));
    }

    #[test]
    fn test_transaction_skips_empty_patches() {
        let mut txn = Transaction::new("s1");
        txn.patch("a", ElementPatch::new()).remove("b");
        assert_eq!(txn.len(), 1);
        assert_eq!(txn.ops[0], DocumentOp::RemoveElement("b".into()));
    }
}
