//! In-memory replicated document for tests and single-user sessions.

use std::cell::RefCell;
use std::collections::HashMap;

use tokio::sync::broadcast;

use super::{
    ChangeEvent, ChangeOrigin, DocumentOp, ReplicatedDocument, SlideData, Transaction,
    UndoContext, merge_order,
};
use crate::config::EngineConfig;
use crate::elements::SlideId;
use crate::error::DocumentResult;

type Slides = HashMap<SlideId, SlideData>;

/// A snapshot of all slides plus the context recorded for that step.
#[derive(Debug, Clone)]
struct UndoEntry {
    slides: Slides,
    context: UndoContext,
}

#[derive(Debug, Default)]
struct State {
    slides: Slides,
    undo_stack: Vec<UndoEntry>,
    redo_stack: Vec<UndoEntry>,
    pending_context: UndoContext,
}

/// In-memory document with snapshot-based undo.
///
/// Undo restores whole snapshots, so edits applied with
/// [`MemoryDocument::apply_remote`] after a local step are reverted along with
/// it. Use [`super::LoroDocument`] when that matters.
pub struct MemoryDocument {
    state: RefCell<State>,
    changes: broadcast::Sender<ChangeEvent>,
    max_undo_steps: usize,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        let (changes, _) = broadcast::channel(config.change_feed_capacity.max(1));
        Self {
            state: RefCell::new(State::default()),
            changes,
            max_undo_steps: config.max_undo_steps,
        }
    }

    /// Apply a transaction as if it came from a peer: no undo step is recorded.
    pub fn apply_remote(&self, txn: Transaction) {
        if txn.is_empty() {
            return;
        }
        apply(&mut self.state.borrow_mut().slides, txn);
        self.emit(ChangeOrigin::Remote);
    }

    fn emit(&self, origin: ChangeOrigin) {
        // No receivers is not an error
        let _ = self.changes.send(ChangeEvent { origin });
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicatedDocument for MemoryDocument {
    fn perform_change(&self, txn: Transaction) -> DocumentResult<()> {
        if txn.is_empty() {
            return Ok(());
        }
        {
            let mut state = self.state.borrow_mut();
            let before = state.slides.clone();
            let slide_id = txn.slide_id.clone();
            apply(&mut state.slides, txn);
            // Nothing changed, so there is no step to undo
            let unchanged = match before.get(&slide_id) {
                Some(previous) => state.slides.get(&slide_id) == Some(previous),
                None => state.slides.get(&slide_id).is_none_or(|data| *data == SlideData::default()),
            };
            if unchanged {
                state.slides = before;
                return Ok(());
            }
            let entry = UndoEntry {
                slides: before,
                context: state.pending_context.clone(),
            };
            state.undo_stack.push(entry);
            state.redo_stack.clear();
            if state.undo_stack.len() > self.max_undo_steps {
                state.undo_stack.remove(0);
            }
        }
        self.emit(ChangeOrigin::Local);
        Ok(())
    }

    fn get_data(&self, slide_id: &str) -> SlideData {
        self.state
            .borrow()
            .slides
            .get(slide_id)
            .cloned()
            .unwrap_or_default()
    }

    fn observe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    fn set_undo_context(&self, context: UndoContext) {
        self.state.borrow_mut().pending_context = context;
    }

    fn undo(&self) -> DocumentResult<Option<UndoContext>> {
        let context = {
            let mut state = self.state.borrow_mut();
            let Some(entry) = state.undo_stack.pop() else {
                return Ok(None);
            };
            let current = std::mem::replace(&mut state.slides, entry.slides);
            state.redo_stack.push(UndoEntry {
                slides: current,
                context: entry.context.clone(),
            });
            entry.context
        };
        self.emit(ChangeOrigin::Undo);
        Ok(Some(context))
    }

    fn redo(&self) -> DocumentResult<Option<UndoContext>> {
        let context = {
            let mut state = self.state.borrow_mut();
            let Some(entry) = state.redo_stack.pop() else {
                return Ok(None);
            };
            let current = std::mem::replace(&mut state.slides, entry.slides);
            state.undo_stack.push(UndoEntry {
                slides: current,
                context: entry.context.clone(),
            });
            entry.context
        };
        self.emit(ChangeOrigin::Redo);
        Ok(Some(context))
    }

    fn can_undo(&self) -> bool {
        !self.state.borrow().undo_stack.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.state.borrow().redo_stack.is_empty()
    }
}

fn apply(slides: &mut Slides, txn: Transaction) {
    let slide = slides.entry(txn.slide_id).or_default();
    for op in txn.ops {
        match op {
            DocumentOp::InsertElement(element) => {
                let id = element.id().clone();
                if !slide.order.contains(&id) {
                    slide.order.push(id.clone());
                }
                slide.elements.insert(id, element);
            }
            DocumentOp::PatchElement { id, patch } => match slide.elements.get_mut(&id) {
                Some(element) => patch.apply_to(element),
                None => log::debug!("Skipping patch for missing element {}", id),
            },
            DocumentOp::RemoveElement(id) => {
                slide.elements.remove(&id);
                slide.order.retain(|other| *other != id);
            }
            DocumentOp::Reorder(requested) => {
                let elements = &slide.elements;
                slide.order = merge_order(&slide.order, &requested, |id| elements.contains_key(id));
            }
            DocumentOp::SetLock(holder) => slide.lock = holder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Element, ElementPatch, Shape, ShapeKind};
    use kurbo::Point;

    fn rect(id: &str) -> Element {
        Shape::new(ShapeKind::Rectangle, Point::ZERO, 10.0, 10.0)
            .with_id(id)
            .into()
    }

    #[test]
    fn test_insert_patch_remove() {
        let doc = MemoryDocument::new();
        let mut txn = Transaction::new("s");
        txn.insert(rect("a")).insert(rect("b"));
        doc.perform_change(txn).unwrap();

        let mut txn = Transaction::new("s");
        txn.patch("a", ElementPatch::new().position(Point::new(5.0, 5.0)))
            .remove("b")
            .patch("ghost", ElementPatch::new().size(1.0, 1.0));
        doc.perform_change(txn).unwrap();

        let data = doc.get_data("s");
        assert_eq!(data.order, vec!["a".to_string()]);
        assert_eq!(data.elements["a"].position(), Point::new(5.0, 5.0));
        assert!(!data.elements.contains_key("ghost"));
    }

    #[test]
    fn test_undo_redo_restore_context() {
        let doc = MemoryDocument::new();
        let context = UndoContext {
            current_slide_id: "s".into(),
            current_element_ids: vec!["a".into()],
        };
        doc.set_undo_context(context.clone());
        let mut txn = Transaction::new("s");
        txn.insert(rect("a"));
        doc.perform_change(txn).unwrap();

        assert!(doc.can_undo());
        assert_eq!(doc.undo().unwrap(), Some(context.clone()));
        assert!(doc.get_data("s").elements.is_empty());
        assert_eq!(doc.redo().unwrap(), Some(context));
        assert_eq!(doc.get_data("s").elements.len(), 1);
        assert_eq!(doc.redo().unwrap(), None);
    }

    #[test]
    fn test_unchanged_commit_records_no_undo_step() {
        let doc = MemoryDocument::new();
        let mut txn = Transaction::new("s");
        txn.set_lock(None);
        doc.perform_change(txn).unwrap();
        assert!(!doc.can_undo());

        let mut txn = Transaction::new("s");
        txn.insert(rect("a"));
        doc.perform_change(txn).unwrap();
        let mut txn = Transaction::new("s");
        txn.patch("a", ElementPatch::new().position(Point::ZERO));
        doc.perform_change(txn).unwrap();

        assert!(doc.undo().unwrap().is_some());
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_changes_are_broadcast() {
        let doc = MemoryDocument::new();
        let mut changes = doc.observe_changes();
        let mut txn = Transaction::new("s");
        txn.set_lock(Some("u1".into()));
        doc.apply_remote(txn);

        assert_eq!(
            changes.try_recv().unwrap(),
            ChangeEvent { origin: ChangeOrigin::Remote }
        );
        assert_eq!(doc.get_data("s").lock.as_deref(), Some("u1"));
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_undo_history_is_bounded() {
        let config = EngineConfig {
            max_undo_steps: 2,
            ..EngineConfig::default()
        };
        let doc = MemoryDocument::with_config(&config);
        for id in ["a", "b", "c"] {
            let mut txn = Transaction::new("s");
            txn.insert(rect(id));
            doc.perform_change(txn).unwrap();
        }
        assert!(doc.undo().unwrap().is_some());
        assert!(doc.undo().unwrap().is_some());
        assert!(doc.undo().unwrap().is_none());
        assert_eq!(doc.get_data("s").order, vec!["a".to_string()]);
    }
}
