//! Loro-backed replicated document.

use std::cell::RefCell;
use std::collections::HashSet;

use loro::{
    Container, ExportMode, LoroDoc, LoroList, LoroMap, LoroValue, UndoManager, ValueOrContainer,
    VersionVector,
};
use tokio::sync::broadcast;

use super::convert::{element_from_loro, element_to_loro, patch_to_loro};
use super::{
    ChangeEvent, ChangeOrigin, DocumentOp, ReplicatedDocument, SlideData, Transaction,
    UndoContext, merge_order,
};
use crate::config::EngineConfig;
use crate::elements::{Element, ElementId, ElementPatch, UserId};
use crate::error::{DocumentError, DocumentResult};

/// Prefix of the per-slide element map (`elements:<slide id>`).
pub const ELEMENTS_PREFIX: &str = "elements:";
/// Prefix of the per-slide paint order list (`order:<slide id>`).
pub const ORDER_PREFIX: &str = "order:";
/// Key of the map holding the lock holder of every locked slide.
pub const LOCKS_KEY: &str = "locks";

/// Undo manager plus the selection contexts recorded for each step.
struct UndoState {
    manager: UndoManager,
    pending_context: UndoContext,
    undo_contexts: Vec<UndoContext>,
    redo_contexts: Vec<UndoContext>,
}

/// A CRDT-backed document for collaborative slide editing.
///
/// Wraps a `LoroDoc` and an `UndoManager`. Every [`Transaction`] is one Loro
/// commit and one undo step. Updates from peers are merged with
/// [`LoroDocument::import`].
pub struct LoroDocument {
    doc: LoroDoc,
    undo: RefCell<UndoState>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl LoroDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self::from_doc(LoroDoc::new(), config)
    }

    /// Create a document from a snapshot. Undo history starts empty.
    pub fn from_snapshot(bytes: &[u8], config: &EngineConfig) -> DocumentResult<Self> {
        let doc = LoroDoc::new();
        doc.import(bytes)?;
        Ok(Self::from_doc(doc, config))
    }

    fn from_doc(doc: LoroDoc, config: &EngineConfig) -> Self {
        let mut manager = UndoManager::new(&doc);
        manager.set_max_undo_steps(config.max_undo_steps);
        // One commit per undo step
        manager.set_merge_interval(0);
        let (changes, _) = broadcast::channel(config.change_feed_capacity.max(1));
        Self {
            doc,
            undo: RefCell::new(UndoState {
                manager,
                pending_context: UndoContext::default(),
                undo_contexts: Vec::new(),
                redo_contexts: Vec::new(),
            }),
            changes,
        }
    }

    /// Get the underlying LoroDoc.
    pub fn loro_doc(&self) -> &LoroDoc {
        &self.doc
    }

    pub fn peer_id(&self) -> u64 {
        self.doc.peer_id()
    }

    fn elements_map(&self, slide_id: &str) -> LoroMap {
        self.doc.get_map(format!("{ELEMENTS_PREFIX}{slide_id}"))
    }

    fn order_list(&self, slide_id: &str) -> LoroList {
        self.doc.get_list(format!("{ORDER_PREFIX}{slide_id}"))
    }

    fn locks_map(&self) -> LoroMap {
        self.doc.get_map(LOCKS_KEY)
    }

    /// Export the document as a snapshot (full state).
    pub fn export_snapshot(&self) -> DocumentResult<Vec<u8>> {
        self.doc
            .export(ExportMode::Snapshot)
            .map_err(|e| DocumentError::Export(e.to_string()))
    }

    /// Export incremental updates since a version.
    pub fn export_updates(&self, since: &VersionVector) -> DocumentResult<Vec<u8>> {
        self.doc
            .export(ExportMode::updates(since))
            .map_err(|e| DocumentError::Export(e.to_string()))
    }

    /// Import updates or a snapshot from another replica. Emits a
    /// [`ChangeOrigin::Remote`] event.
    pub fn import(&self, bytes: &[u8]) -> DocumentResult<()> {
        self.doc.import(bytes)?;
        self.emit(ChangeOrigin::Remote);
        Ok(())
    }

    /// Get the current version vector.
    pub fn version(&self) -> VersionVector {
        self.doc.oplog_vv()
    }

    /// Number of undo steps available.
    pub fn undo_count(&self) -> usize {
        self.undo.borrow().manager.undo_count()
    }

    fn emit(&self, origin: ChangeOrigin) {
        let _ = self.changes.send(ChangeEvent { origin });
    }

    fn apply(&self, txn: Transaction) -> DocumentResult<()> {
        let elements = self.elements_map(&txn.slide_id);
        let order = self.order_list(&txn.slide_id);

        for op in txn.ops {
            match op {
                DocumentOp::InsertElement(element) => {
                    let id = element.id().clone();
                    let map = elements.insert_container(&id, LoroMap::new())?;
                    element_to_loro(&element, &map)?;
                    if !read_order(&order).contains(&id) {
                        order.push(id)?;
                    }
                }
                DocumentOp::PatchElement { id, patch } => {
                    self.patch_element(&elements, &id, &patch)?;
                }
                DocumentOp::RemoveElement(id) => {
                    elements.delete(&id)?;
                    remove_from_order(&order, &id)?;
                }
                DocumentOp::Reorder(requested) => {
                    let current = read_order(&order);
                    let present = read_element_ids(&elements);
                    let merged = merge_order(&current, &requested, |id| present.contains(id));
                    if merged != current {
                        order.delete(0, order.len())?;
                        for id in merged {
                            order.push(id)?;
                        }
                    }
                }
                DocumentOp::SetLock(holder) => self.write_lock(&txn.slide_id, holder)?,
            }
        }
        Ok(())
    }

    /// Fail before anything is written when a patch targets an element that
    /// cannot be decoded. Targets inserted earlier in the transaction are
    /// replaced, so they are not checked.
    fn check_patch_targets(&self, txn: &Transaction) -> DocumentResult<()> {
        let elements = self.elements_map(&txn.slide_id);
        let mut inserted = HashSet::new();
        for op in &txn.ops {
            match op {
                DocumentOp::InsertElement(element) => {
                    inserted.insert(element.id());
                }
                DocumentOp::PatchElement { id, .. } if !inserted.contains(id) => {
                    read_element(&elements, id)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn patch_element(
        &self,
        elements: &LoroMap,
        id: &ElementId,
        patch: &ElementPatch,
    ) -> DocumentResult<()> {
        let Some((map, current)) = read_element(elements, id)? else {
            log::debug!("Skipping patch for missing element {}", id);
            return Ok(());
        };
        patch_to_loro(&current, patch, &map)?;
        Ok(())
    }

    fn write_lock(&self, slide_id: &str, holder: Option<UserId>) -> DocumentResult<()> {
        let locks = self.locks_map();
        let current = match locks.get(slide_id) {
            Some(ValueOrContainer::Value(LoroValue::String(current))) => Some(current.to_string()),
            _ => None,
        };
        if current == holder {
            return Ok(());
        }
        match holder {
            Some(holder) => locks.insert(slide_id, holder)?,
            None => locks.delete(slide_id)?,
        }
        Ok(())
    }

    /// Drop a partially applied change. Loro keeps the failed commit as an
    /// undo step, so it is undone at once and the history is reset.
    fn roll_back(&self, before: &VersionVector) {
        self.doc.commit();
        if self.doc.oplog_vv() == *before {
            return;
        }
        let mut undo = self.undo.borrow_mut();
        if let Err(e) = undo.manager.undo() {
            log::error!("Failed to roll back partial change: {}", e);
        }
        undo.manager.clear();
        undo.undo_contexts.clear();
        undo.redo_contexts.clear();
        log::warn!("Rolled back a partial change; undo history was cleared");
    }
}

impl Default for LoroDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicatedDocument for LoroDocument {
    fn perform_change(&self, txn: Transaction) -> DocumentResult<()> {
        if txn.is_empty() {
            return Ok(());
        }
        self.check_patch_targets(&txn)?;
        let before = self.doc.oplog_vv();
        if let Err(e) = self.apply(txn) {
            self.roll_back(&before);
            return Err(e);
        }
        self.doc.commit();
        // Loro records no undo step for a commit without new ops
        if self.doc.oplog_vv() == before {
            return Ok(());
        }

        {
            let mut undo = self.undo.borrow_mut();
            let context = undo.pending_context.clone();
            undo.undo_contexts.push(context);
            undo.redo_contexts.clear();
            let steps = undo.manager.undo_count();
            if undo.undo_contexts.len() > steps {
                let excess = undo.undo_contexts.len() - steps;
                undo.undo_contexts.drain(..excess);
            }
        }
        self.emit(ChangeOrigin::Local);
        Ok(())
    }

    fn get_data(&self, slide_id: &str) -> SlideData {
        let mut data = SlideData::default();
        if let LoroValue::Map(map) = self.elements_map(slide_id).get_deep_value() {
            for (id, value) in map.iter() {
                let LoroValue::Map(element_map) = value else {
                    continue;
                };
                match element_from_loro(id, element_map) {
                    Some(element) => {
                        data.elements.insert(id.clone(), element);
                    }
                    None => log::warn!("Skipping undecodable element {}", id),
                }
            }
        }
        data.order = read_order(&self.order_list(slide_id));
        if let Some(ValueOrContainer::Value(LoroValue::String(holder))) =
            self.locks_map().get(slide_id)
        {
            data.lock = Some(holder.to_string());
        }
        data
    }

    fn observe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    fn set_undo_context(&self, context: UndoContext) {
        self.undo.borrow_mut().pending_context = context;
    }

    fn undo(&self) -> DocumentResult<Option<UndoContext>> {
        let context = {
            let mut undo = self.undo.borrow_mut();
            if !undo.manager.undo()? {
                return Ok(None);
            }
            let context = undo.undo_contexts.pop().unwrap_or_default();
            undo.redo_contexts.push(context.clone());
            context
        };
        self.emit(ChangeOrigin::Undo);
        Ok(Some(context))
    }

    fn redo(&self) -> DocumentResult<Option<UndoContext>> {
        let context = {
            let mut undo = self.undo.borrow_mut();
            if !undo.manager.redo()? {
                return Ok(None);
            }
            let context = undo.redo_contexts.pop().unwrap_or_default();
            undo.undo_contexts.push(context.clone());
            context
        };
        self.emit(ChangeOrigin::Redo);
        Ok(Some(context))
    }

    fn can_undo(&self) -> bool {
        self.undo.borrow().manager.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.undo.borrow().manager.can_redo()
    }
}

fn read_order(list: &LoroList) -> Vec<ElementId> {
    let mut result = Vec::with_capacity(list.len());
    for i in 0..list.len() {
        if let Some(ValueOrContainer::Value(LoroValue::String(id))) = list.get(i) {
            result.push(id.to_string());
        }
    }
    result
}

/// The element map under `id` and its decoded value. `None` when absent.
fn read_element(elements: &LoroMap, id: &str) -> DocumentResult<Option<(LoroMap, Element)>> {
    let Some(ValueOrContainer::Container(Container::Map(map))) = elements.get(id) else {
        return Ok(None);
    };
    let LoroValue::Map(value) = map.get_deep_value() else {
        return Err(DocumentError::Corrupt(format!("element {id} is not a map")));
    };
    match element_from_loro(id, &value) {
        Some(element) => Ok(Some((map, element))),
        None => Err(DocumentError::Corrupt(format!("element {id} cannot be decoded"))),
    }
}

fn read_element_ids(map: &LoroMap) -> Vec<ElementId> {
    match map.get_deep_value() {
        LoroValue::Map(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

fn remove_from_order(list: &LoroList, id: &str) -> DocumentResult<()> {
    for i in (0..list.len()).rev() {
        if let Some(ValueOrContainer::Value(LoroValue::String(s))) = list.get(i) {
            if s.as_ref() == id {
                list.delete(i, 1)?;
            }
        }
    }
    Ok(())
}
