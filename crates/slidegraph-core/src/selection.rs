//! Active selection of a slide instance.
//!
//! The selection is local to one client and never replicated. Every change
//! is mirrored into an [`UndoContext`] so an undo step can restore the
//! selection that was active when the edit happened.

use serde::{Deserialize, Serialize};

use crate::crdt::UndoContext;
use crate::elements::{ElementId, SlideId};

/// Ordered, duplicate-free list of active element ids on one slide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    slide_id: SlideId,
    ids: Vec<ElementId>,
}

impl SelectionState {
    pub fn new(slide_id: impl Into<SlideId>) -> Self {
        Self {
            slide_id: slide_id.into(),
            ids: Vec::new(),
        }
    }

    pub fn ids(&self) -> &[ElementId] {
        &self.ids
    }

    /// First selected id. Kept for callers that only handle one element.
    pub fn active_id(&self) -> Option<&ElementId> {
        self.ids.first()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|other| other == id)
    }

    /// Replace the selection with the known ids of `ids`, in the given order.
    /// Returns whether the selection changed.
    pub fn set(&mut self, ids: &[ElementId], exists: impl Fn(&str) -> bool) -> bool {
        let mut next: Vec<ElementId> = Vec::with_capacity(ids.len());
        for id in ids {
            if exists(id) && !next.contains(id) {
                next.push(id.clone());
            }
        }
        self.replace(next)
    }

    /// Select exactly `id`, or nothing.
    pub fn set_single(&mut self, id: Option<&str>, exists: impl Fn(&str) -> bool) -> bool {
        let next = id
            .filter(|id| exists(id))
            .map(|id| vec![id.to_string()])
            .unwrap_or_default();
        self.replace(next)
    }

    /// Append `id` if it exists and is not selected yet.
    pub fn add(&mut self, id: &str, exists: impl Fn(&str) -> bool) -> bool {
        if !exists(id) || self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    pub fn unselect(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|other| other != id);
        self.ids.len() != before
    }

    /// Drop ids that no longer exist.
    pub fn retain_existing(&mut self, exists: impl Fn(&str) -> bool) -> bool {
        let next = retain_existing(&self.ids, exists);
        self.replace(next)
    }

    /// Context recorded with the next undo step.
    pub fn undo_context(&self) -> UndoContext {
        UndoContext {
            current_slide_id: self.slide_id.clone(),
            current_element_ids: self.ids.clone(),
        }
    }

    /// Restore a selection recorded in an undo step. Contexts of other slides
    /// are ignored.
    pub fn restore(&mut self, context: &UndoContext, exists: impl Fn(&str) -> bool) -> bool {
        if context.current_slide_id != self.slide_id {
            return false;
        }
        self.set(&context.current_element_ids, exists)
    }

    fn replace(&mut self, next: Vec<ElementId>) -> bool {
        if next == self.ids {
            return false;
        }
        self.ids = next;
        true
    }
}

/// Selection after the element set changed: `previous` minus ids that no
/// longer exist, order kept.
pub fn retain_existing(previous: &[ElementId], exists: impl Fn(&str) -> bool) -> Vec<ElementId> {
    previous.iter().filter(|id| exists(id)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(id: &str) -> bool {
        matches!(id, "a" | "b" | "c")
    }

    fn ids(values: &[&str]) -> Vec<ElementId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_set_filters_unknown_and_duplicates() {
        let mut selection = SelectionState::new("s");
        assert!(selection.set(&ids(&["c", "x", "a", "c"]), known));
        assert_eq!(selection.ids(), ["c", "a"]);
        assert_eq!(selection.active_id().map(String::as_str), Some("c"));
        assert!(!selection.set(&ids(&["c", "a"]), known));
    }

    #[test]
    fn test_add_and_unselect() {
        let mut selection = SelectionState::new("s");
        assert!(selection.add("a", known));
        assert!(!selection.add("a", known));
        assert!(!selection.add("ghost", known));
        assert!(selection.add("b", known));
        assert!(selection.unselect("a"));
        assert!(!selection.unselect("a"));
        assert_eq!(selection.ids(), ["b"]);
    }

    #[test]
    fn test_set_single() {
        let mut selection = SelectionState::new("s");
        selection.set(&ids(&["a", "b"]), known);
        assert!(selection.set_single(Some("c"), known));
        assert_eq!(selection.ids(), ["c"]);
        assert!(selection.set_single(Some("ghost"), known));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_retain_existing_is_pure() {
        let previous = ids(&["a", "x", "b"]);
        assert_eq!(retain_existing(&previous, known), ids(&["a", "b"]));
        assert_eq!(previous.len(), 3);
    }

    #[test]
    fn test_undo_context_and_restore() {
        let mut selection = SelectionState::new("s");
        selection.set(&ids(&["b", "a"]), known);
        let context = selection.undo_context();
        assert_eq!(context.current_slide_id, "s");
        assert_eq!(context.current_element_ids, ids(&["b", "a"]));

        let mut other = SelectionState::new("s");
        assert!(other.restore(&context, |id| id == "a"));
        assert_eq!(other.ids(), ["a"]);

        let foreign = UndoContext {
            current_slide_id: "t".into(),
            current_element_ids: ids(&["c"]),
        };
        assert!(!other.restore(&foreign, known));
    }
}
