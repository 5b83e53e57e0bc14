//! Slide mutation engine.
//!
//! A [`SlideInstance`] is the only writer of one slide. Every operation takes
//! a fresh [`ElementStore`] snapshot, computes the relation compensations it
//! needs from that snapshot, and commits everything as one [`Transaction`].
//! References to unknown elements are corrected silently; the only error an
//! operation reports on its own is [`SlideError::SlideLocked`].

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use kurbo::Vec2;
use tokio::sync::{broadcast, watch};

use crate::crdt::{ChangeEvent, ReplicatedDocument, Transaction, UndoContext};
use crate::elements::{
    BoundingRect, Element, ElementId, ElementPatch, Frame, Path, PathEnd, SlideId, UserId,
};
use crate::error::{SlideError, SlideResult};
use crate::observe::Projections;
use crate::relations;
use crate::selection::SelectionState;
use crate::store::{ElementStore, Staging};

/// Where a reorder moves the selected elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Up,
    Down,
    ToTop,
    ToBottom,
}

/// Engine for one slide of a replicated document.
pub struct SlideInstance<D: ReplicatedDocument + ?Sized> {
    doc: Rc<D>,
    slide_id: SlideId,
    selection: SelectionState,
    projections: Projections,
    changes: broadcast::Receiver<ChangeEvent>,
}

impl<D: ReplicatedDocument + ?Sized> SlideInstance<D> {
    pub fn new(doc: Rc<D>, slide_id: impl Into<SlideId>) -> Self {
        let slide_id = slide_id.into();
        let changes = doc.observe_changes();
        let selection = SelectionState::new(slide_id.clone());
        let store = ElementStore::load(&*doc, &slide_id);
        let projections = Projections::new(&store, &selection);
        log::debug!("Opened slide {}", slide_id);
        Self {
            doc,
            slide_id,
            selection,
            projections,
            changes,
        }
    }

    pub fn slide_id(&self) -> &SlideId {
        &self.slide_id
    }

    pub fn document(&self) -> &Rc<D> {
        &self.doc
    }

    /// Fresh snapshot of the slide.
    pub fn store(&self) -> ElementStore {
        ElementStore::load(&*self.doc, &self.slide_id)
    }

    fn ensure_unlocked(&self, store: &ElementStore) -> SlideResult<()> {
        match store.lock() {
            Some(holder) => Err(SlideError::SlideLocked {
                slide_id: self.slide_id.clone(),
                holder: holder.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Snapshot of an unlocked slide, or `SlideLocked`.
    fn writable_store(&self) -> SlideResult<ElementStore> {
        let store = self.store();
        self.ensure_unlocked(&store)?;
        Ok(store)
    }

    /// Commit `txn`. When `select` is set, those ids become the selection
    /// recorded for this step and the active selection afterwards.
    fn commit(&mut self, txn: Transaction, select: Option<&[ElementId]>) -> SlideResult<()> {
        if txn.is_empty() {
            return Ok(());
        }
        let context = match select {
            Some(ids) => UndoContext {
                current_slide_id: self.slide_id.clone(),
                current_element_ids: ids.to_vec(),
            },
            None => self.selection.undo_context(),
        };
        self.doc.set_undo_context(context);
        let ops = txn.len();
        self.doc.perform_change(txn)?;
        log::debug!("Committed {} ops on slide {}", ops, self.slide_id);

        self.poll_changes();
        if let Some(ids) = select {
            let store = self.store();
            if self.selection.set(ids, |id| store.contains(id)) {
                self.selection_changed();
            }
        }
        Ok(())
    }

    fn selection_changed(&self) {
        self.doc.set_undo_context(self.selection.undo_context());
        self.projections.publish_selection(&self.selection);
    }

    fn refresh(&mut self) {
        let store = self.store();
        if self.selection.retain_existing(|id| store.contains(id)) {
            self.selection_changed();
        }
        self.projections.refresh(&store);
    }

    // --- Change feed ---

    /// Drain pending document changes and refresh projections and
    /// selection. Returns whether anything changed.
    pub fn poll_changes(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.changes.try_recv() {
                Ok(_) => changed = true,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    log::warn!("Slide {} skipped {} change events", self.slide_id, skipped);
                    changed = true;
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
        if changed {
            self.refresh();
        }
        changed
    }

    /// Wait for the next document change and refresh. `None` once the
    /// document is gone.
    pub async fn next_change(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.changes.recv().await {
                Ok(event) => {
                    self.refresh();
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Slide {} skipped {} change events", self.slide_id, skipped);
                    self.refresh();
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    // --- Adding elements ---

    /// Add a single element. Relation fields are never trusted here and are
    /// dropped. The new element becomes the only active element.
    pub fn add_element(&mut self, element: impl Into<Element>) -> SlideResult<ElementId> {
        self.writable_store()?;
        let mut element = element.into();
        element.strip_relations();
        let id = self.doc.generate_id();
        element.set_id(id.clone());

        let mut txn = Transaction::new(self.slide_id.clone());
        txn.insert(element);
        self.commit(txn, Some(&[id.clone()]))?;
        Ok(id)
    }

    /// Add an element keeping its frame attachment when that frame exists.
    /// Other relation fields are dropped.
    pub fn add_element_attached(&mut self, element: impl Into<Element>) -> SlideResult<ElementId> {
        let store = self.writable_store()?;
        let mut element = element.into();
        let frame_id = element.attached_frame().cloned();
        element.strip_relations();
        let id = self.doc.generate_id();
        element.set_id(id.clone());

        let mut staging = Staging::new(&store);
        if let Some(frame_id) = frame_id {
            attach_new(&mut element, &frame_id, &mut staging);
        }

        let mut txn = Transaction::new(self.slide_id.clone());
        txn.insert(element);
        staging.write_to(&mut txn);
        self.commit(txn, Some(&[id.clone()]))?;
        Ok(id)
    }

    /// Add a path keeping the connections and frame attachment whose targets
    /// exist. The connected shapes list the new path in the same transaction.
    pub fn add_path_related(&mut self, path: Path) -> SlideResult<ElementId> {
        let store = self.writable_store()?;
        let mut element = Element::Path(path);
        let declared: Vec<(PathEnd, Option<ElementId>)> = PathEnd::BOTH
            .iter()
            .map(|end| (*end, element.as_path().and_then(|p| p.connection(*end).cloned())))
            .collect();
        let frame_id = element.attached_frame().cloned();
        element.strip_relations();
        let id = self.doc.generate_id();
        element.set_id(id.clone());

        let mut staging = Staging::new(&store);
        for (end, target) in declared {
            let Some(target) = target else {
                continue;
            };
            let Some(shape) = staging.get(&target).and_then(Element::as_shape) else {
                log::debug!("Dropping connection to unknown shape {}", target);
                continue;
            };
            let patch = relations::connect_shape(shape, &id);
            staging.stage(&target, patch);
            ElementPatch::new()
                .connection(end, Some(target))
                .apply_to(&mut element);
        }
        if let Some(frame_id) = frame_id {
            attach_new(&mut element, &frame_id, &mut staging);
        }

        let mut txn = Transaction::new(self.slide_id.clone());
        txn.insert(element);
        staging.write_to(&mut txn);
        self.commit(txn, Some(&[id.clone()]))?;
        Ok(id)
    }

    /// Add several elements without any relations. The new ids become the
    /// selection.
    pub fn add_elements_batch(&mut self, elements: Vec<Element>) -> SlideResult<Vec<ElementId>> {
        self.writable_store()?;
        let mut txn = Transaction::new(self.slide_id.clone());
        let mut ids = Vec::with_capacity(elements.len());
        for mut element in elements {
            element.strip_relations();
            let id = self.doc.generate_id();
            element.set_id(id.clone());
            ids.push(id);
            txn.insert(element);
        }
        self.commit(txn, Some(&ids))?;
        Ok(ids)
    }

    /// Add elements that reference each other, keyed by their current ids.
    ///
    /// Every element gets a fresh id and relation fields are rewritten to
    /// the fresh ids. References leaving the batch are dropped, except an
    /// attachment to a frame that already exists on the slide: that frame
    /// gains the new element. The new ids, in key order, become the
    /// selection.
    pub fn add_elements_with_relations(
        &mut self,
        elements: IndexMap<ElementId, Element>,
    ) -> SlideResult<Vec<ElementId>> {
        let store = self.writable_store()?;
        let fresh: HashMap<ElementId, ElementId> = elements
            .keys()
            .map(|old| (old.clone(), self.doc.generate_id()))
            .collect();

        let mut staging = Staging::new(&store);
        let mut txn = Transaction::new(self.slide_id.clone());
        let mut ids = Vec::with_capacity(elements.len());
        for (old_id, mut element) in elements {
            let id = fresh[&old_id].clone();
            let external_frame = element
                .attached_frame()
                .filter(|frame_id| !fresh.contains_key(*frame_id))
                .cloned();
            element.set_id(id.clone());
            element.rewrite_relations(|target| fresh.get(target).cloned());
            if let Some(frame_id) = external_frame {
                attach_new(&mut element, &frame_id, &mut staging);
            }
            txn.insert(element);
            ids.push(id);
        }
        staging.write_to(&mut txn);
        self.commit(txn, Some(&ids))?;
        Ok(ids)
    }

    /// Duplicate elements, moved by `offset`. Relations among the duplicated
    /// elements are kept between the copies.
    pub fn duplicate_elements(
        &mut self,
        ids: &[ElementId],
        offset: Vec2,
    ) -> SlideResult<Vec<ElementId>> {
        let store = self.writable_store()?;
        let copies: IndexMap<ElementId, Element> = store
            .sort_ids(ids)
            .into_iter()
            .filter_map(|id| {
                let mut element = store.get(&id)?.clone();
                element.translate(offset);
                Some((id, element))
            })
            .collect();
        if copies.is_empty() {
            return Ok(Vec::new());
        }
        self.add_elements_with_relations(copies)
    }

    // --- Removing and updating ---

    /// Remove elements and every reference to them. Paths connected to a
    /// removed shape stay with that end cleared; elements attached to a
    /// removed frame stay, detached.
    pub fn remove_elements(&mut self, ids: &[ElementId]) -> SlideResult<()> {
        let store = self.writable_store()?;
        let removed = store.sort_ids(ids);
        if removed.is_empty() {
            return Ok(());
        }
        let removing: HashSet<&ElementId> = removed.iter().collect();

        let mut txn = Transaction::new(self.slide_id.clone());
        for element in store.elements().filter(|e| !removing.contains(e.id())) {
            if let Some(patch) = relations::compensate_removal(element, &removed) {
                txn.patch(element.id().clone(), patch);
            }
        }
        for id in &removed {
            txn.remove(id.clone());
        }
        log::debug!("Removing {} elements from slide {}", removed.len(), self.slide_id);
        self.commit(txn, None)
    }

    /// Apply a patch as is. Relation fields are written without touching the
    /// other side; callers moving related elements compute compensations
    /// themselves.
    pub fn update_element(&mut self, id: &str, patch: ElementPatch) -> SlideResult<()> {
        self.update_elements(vec![(id.to_string(), patch)])
    }

    /// Apply several patches in one transaction. Unknown ids are skipped.
    pub fn update_elements(&mut self, patches: Vec<(ElementId, ElementPatch)>) -> SlideResult<()> {
        let store = self.writable_store()?;
        let mut staging = Staging::new(&store);
        staging.stage_all(patches);
        if staging.is_empty() {
            return Ok(());
        }
        let mut txn = Transaction::new(self.slide_id.clone());
        staging.write_to(&mut txn);
        self.commit(txn, None)
    }

    // --- Relations ---

    /// Connect one end of a path to a shape. A shape previously connected at
    /// that end loses one entry for the path.
    pub fn connect_path(&mut self, path_id: &str, end: PathEnd, shape_id: &str) -> SlideResult<()> {
        let store = self.writable_store()?;
        let (Some(path), Some(shape)) = (
            store.get(path_id).and_then(Element::as_path),
            store.get(shape_id).and_then(Element::as_shape),
        ) else {
            return Ok(());
        };
        let Some(path_patch) = relations::connect_path(path, end, shape_id) else {
            return Ok(());
        };

        let mut staging = Staging::new(&store);
        if let Some(previous) = path.connection(end).and_then(|id| store.get(id)?.as_shape()) {
            if let Some(patch) = relations::disconnect_shape(previous, Some(&[path.id.clone()]), false) {
                staging.stage(&previous.id, patch);
            }
        }
        staging.stage(path_id, path_patch);
        if let Some(shape) = staging.get(shape_id).and_then(Element::as_shape) {
            let patch = relations::connect_shape(shape, path_id);
            staging.stage(shape_id, patch);
        }
        self.commit_staging(staging)
    }

    /// Disconnect one end of a path. The shape it pointed at loses one entry
    /// for the path.
    pub fn disconnect_path_end(&mut self, path_id: &str, end: PathEnd) -> SlideResult<()> {
        let store = self.writable_store()?;
        let Some(path) = store.get(path_id).and_then(Element::as_path) else {
            return Ok(());
        };
        let Some(path_patch) = relations::disconnect_path_at(path, end) else {
            return Ok(());
        };

        let mut staging = Staging::new(&store);
        if let Some(shape) = path.connection(end).and_then(|id| store.get(id)?.as_shape()) {
            if let Some(patch) = relations::disconnect_shape(shape, Some(&[path.id.clone()]), false) {
                staging.stage(&shape.id, patch);
            }
        }
        staging.stage(path_id, path_patch);
        self.commit_staging(staging)
    }

    /// Attach an element to a frame, detaching it from its current frame.
    pub fn attach_to_frame(&mut self, element_id: &str, frame_id: &str) -> SlideResult<()> {
        let store = self.writable_store()?;
        let (Some(element), Some(frame)) = (store.get(element_id), store.frame(frame_id)) else {
            return Ok(());
        };
        let previous = element.attached_frame().and_then(|id| store.frame(id));
        let mut staging = Staging::new(&store);
        staging.stage_all(relations::attach_to_frame(element, frame, previous));
        self.commit_staging(staging)
    }

    /// Detach an element from its frame.
    pub fn detach_from_frame(&mut self, element_id: &str) -> SlideResult<()> {
        let store = self.writable_store()?;
        let Some(element) = store.get(element_id) else {
            return Ok(());
        };
        let frame = element.attached_frame().and_then(|id| store.frame(id));
        let mut staging = Staging::new(&store);
        staging.stage_all(relations::detach_from_frame(element, frame));
        self.commit_staging(staging)
    }

    /// Attach each element to the topmost frame fully containing it, or
    /// detach it when no frame does.
    pub fn auto_attach(&mut self, element_ids: &[ElementId]) -> SlideResult<()> {
        let store = self.writable_store()?;
        let frame_ids: Vec<ElementId> = store.frames().iter().map(|f| f.id.clone()).collect();
        let mut staging = Staging::new(&store);

        for id in store.sort_ids(element_ids) {
            let patches = {
                let Some(element) = staging.get(&id) else {
                    continue;
                };
                let frames: Vec<&Frame> = frame_ids
                    .iter()
                    .filter_map(|fid| staging.get(fid).and_then(Element::as_frame))
                    .collect();
                let current = element.attached_frame().and_then(|fid| {
                    frames.iter().copied().find(|frame| &frame.id == fid)
                });
                match relations::find_frame_for_position(element, frames.iter().copied()) {
                    Some(target) => match frames.iter().find(|frame| frame.id == target) {
                        Some(frame) => relations::attach_to_frame(element, frame, current),
                        None => Vec::new(),
                    },
                    None => relations::detach_from_frame(element, current),
                }
            };
            staging.stage_all(patches);
        }
        self.commit_staging(staging)
    }

    fn commit_staging(&mut self, staging: Staging<'_>) -> SlideResult<()> {
        if staging.is_empty() {
            return Ok(());
        }
        let mut txn = Transaction::new(self.slide_id.clone());
        staging.write_to(&mut txn);
        self.commit(txn, None)
    }

    // --- Paint order ---

    fn reorder(&mut self, ids: &[ElementId], direction: Move) -> SlideResult<()> {
        let store = self.writable_store()?;
        let moving = store.sort_ids(ids);
        if moving.is_empty() {
            return Ok(());
        }
        let current = store.element_ids().to_vec();
        let order = reordered(&current, &moving, direction);
        if order == current {
            return Ok(());
        }
        let mut txn = Transaction::new(self.slide_id.clone());
        txn.reorder(order);
        self.commit(txn, None)
    }

    /// Move each element one step towards the front.
    pub fn move_elements_up(&mut self, ids: &[ElementId]) -> SlideResult<()> {
        self.reorder(ids, Move::Up)
    }

    /// Move each element one step towards the back.
    pub fn move_elements_down(&mut self, ids: &[ElementId]) -> SlideResult<()> {
        self.reorder(ids, Move::Down)
    }

    /// Bring elements to the front, keeping their relative order.
    pub fn move_elements_to_top(&mut self, ids: &[ElementId]) -> SlideResult<()> {
        self.reorder(ids, Move::ToTop)
    }

    /// Send elements to the back, keeping their relative order.
    pub fn move_elements_to_bottom(&mut self, ids: &[ElementId]) -> SlideResult<()> {
        self.reorder(ids, Move::ToBottom)
    }

    pub fn move_element_up(&mut self, id: &str) -> SlideResult<()> {
        self.move_elements_up(&[id.to_string()])
    }

    pub fn move_element_down(&mut self, id: &str) -> SlideResult<()> {
        self.move_elements_down(&[id.to_string()])
    }

    pub fn move_element_to_top(&mut self, id: &str) -> SlideResult<()> {
        self.move_elements_to_top(&[id.to_string()])
    }

    pub fn move_element_to_bottom(&mut self, id: &str) -> SlideResult<()> {
        self.move_elements_to_bottom(&[id.to_string()])
    }

    /// Known ids of `ids`, in paint order.
    pub fn sort_element_ids(&self, ids: &[ElementId]) -> Vec<ElementId> {
        self.store().sort_ids(ids)
    }

    // --- Selection ---

    /// Select one element, or clear the selection with `None`.
    pub fn set_active_element_id(&mut self, id: Option<&str>) {
        let store = self.store();
        if self.selection.set_single(id, |id| store.contains(id)) {
            self.selection_changed();
        }
    }

    pub fn set_active_element_ids(&mut self, ids: &[ElementId]) {
        let store = self.store();
        if self.selection.set(ids, |id| store.contains(id)) {
            self.selection_changed();
        }
    }

    pub fn add_active_element_id(&mut self, id: &str) {
        let store = self.store();
        if self.selection.add(id, |id| store.contains(id)) {
            self.selection_changed();
        }
    }

    pub fn unselect_active_element_id(&mut self, id: &str) {
        if self.selection.unselect(id) {
            self.selection_changed();
        }
    }

    /// First active element.
    pub fn active_element_id(&self) -> Option<&ElementId> {
        self.selection.active_id()
    }

    pub fn active_element_ids(&self) -> &[ElementId] {
        self.selection.ids()
    }

    // --- Locking ---

    pub fn lock_slide(&mut self, user_id: impl Into<UserId>) -> SlideResult<()> {
        let user_id = user_id.into();
        log::info!("Locking slide {} for {}", self.slide_id, user_id);
        let mut txn = Transaction::new(self.slide_id.clone());
        txn.set_lock(Some(user_id));
        self.commit(txn, None)
    }

    pub fn unlock_slide(&mut self) -> SlideResult<()> {
        log::info!("Unlocking slide {}", self.slide_id);
        let mut txn = Transaction::new(self.slide_id.clone());
        txn.set_lock(None);
        self.commit(txn, None)
    }

    pub fn is_locked(&self) -> bool {
        self.store().is_locked()
    }

    pub fn lock_holder(&self) -> Option<UserId> {
        self.store().lock().cloned()
    }

    // --- Undo/Redo ---

    /// Undo the last local step and restore the selection recorded with it.
    /// Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> SlideResult<bool> {
        self.writable_store()?;
        let Some(context) = self.doc.undo()? else {
            return Ok(false);
        };
        self.restore_context(&context);
        Ok(true)
    }

    /// Redo the last undone step.
    pub fn redo(&mut self) -> SlideResult<bool> {
        self.writable_store()?;
        let Some(context) = self.doc.redo()? else {
            return Ok(false);
        };
        self.restore_context(&context);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.doc.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.doc.can_redo()
    }

    fn restore_context(&mut self, context: &UndoContext) {
        self.poll_changes();
        let store = self.store();
        if self.selection.restore(context, |id| store.contains(id)) {
            self.selection_changed();
        }
    }

    // --- Queries ---

    pub fn element(&self, id: &str) -> Option<Element> {
        self.store().get(id).cloned()
    }

    /// Known elements of `ids`, in the given order.
    pub fn elements(&self, ids: &[ElementId]) -> Vec<Element> {
        let store = self.store();
        ids.iter().filter_map(|id| store.get(id).cloned()).collect()
    }

    /// Element ids in paint order.
    pub fn element_ids(&self) -> Vec<ElementId> {
        self.store().element_ids().to_vec()
    }

    /// Frames in paint order.
    pub fn frames(&self) -> Vec<Frame> {
        self.store().frames().into_iter().cloned().collect()
    }

    /// Elements attached to a frame, in attachment order.
    pub fn attached_elements(&self, frame_id: &str) -> Vec<Element> {
        let store = self.store();
        store
            .frame(frame_id)
            .map(|frame| {
                frame
                    .attached_elements
                    .iter()
                    .filter_map(|id| store.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn bounding_rect(&self, ids: &[ElementId]) -> Option<BoundingRect> {
        self.store().bounding_rect(ids)
    }

    // --- Observation ---

    pub fn subscribe_element_ids(&self) -> watch::Receiver<Vec<ElementId>> {
        self.projections.element_ids()
    }

    pub fn subscribe_element(&mut self, id: &str) -> watch::Receiver<Option<Element>> {
        let store = self.store();
        self.projections.element(id, &store)
    }

    pub fn subscribe_frames(&self) -> watch::Receiver<Vec<Frame>> {
        self.projections.frames()
    }

    pub fn subscribe_lock(&self) -> watch::Receiver<Option<UserId>> {
        self.projections.lock()
    }

    pub fn subscribe_active_element_ids(&self) -> watch::Receiver<Vec<ElementId>> {
        self.projections.active_element_ids()
    }

    pub fn subscribe_active_element_id(&self) -> watch::Receiver<Option<ElementId>> {
        self.projections.active_element_id()
    }

    /// Tear down the instance. Every subscription sees its channel close.
    pub fn destroy(self) {
        log::debug!("Closing slide {}", self.slide_id);
    }
}

/// Attach a not yet inserted element to an existing frame. The frame patch
/// is staged; the element is updated in place. Unknown frames are ignored.
fn attach_new(element: &mut Element, frame_id: &str, staging: &mut Staging<'_>) {
    let Some(frame) = staging.get(frame_id).and_then(Element::as_frame) else {
        log::debug!("Dropping attachment to unknown frame {}", frame_id);
        return;
    };
    let patches = relations::attach_to_frame(element, frame, None);
    let id = element.id().clone();
    for (target, patch) in patches {
        if target == id {
            patch.apply_to(element);
        } else {
            staging.stage(&target, patch);
        }
    }
}

/// Paint order after moving `moving` (already in paint order).
fn reordered(current: &[ElementId], moving: &[ElementId], direction: Move) -> Vec<ElementId> {
    let set: HashSet<&ElementId> = moving.iter().collect();
    let mut order = current.to_vec();
    match direction {
        Move::ToTop => {
            order.retain(|id| !set.contains(id));
            order.extend(moving.iter().cloned());
        }
        Move::ToBottom => {
            order.retain(|id| !set.contains(id));
            let mut front = moving.to_vec();
            front.extend(order);
            order = front;
        }
        Move::Up => {
            for i in (0..order.len().saturating_sub(1)).rev() {
                if set.contains(&order[i]) && !set.contains(&order[i + 1]) {
                    order.swap(i, i + 1);
                }
            }
        }
        Move::Down => {
            for i in 1..order.len() {
                if set.contains(&order[i]) && !set.contains(&order[i - 1]) {
                    order.swap(i, i - 1);
                }
            }
        }
    }
    order
}
