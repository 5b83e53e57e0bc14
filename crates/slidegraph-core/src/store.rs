//! Element store: a normalized, read-only snapshot of one slide.
//!
//! The store is rebuilt from the document on every operation and never
//! cached across transactions. Normalization happens on load:
//!
//! - order entries without an element are dropped, duplicates collapse to
//!   their first occurrence,
//! - elements missing from the order list are appended, sorted by id,
//! - relation fields that point at missing elements, or at elements of the
//!   wrong kind, are pruned.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::crdt::{ReplicatedDocument, SlideData, Transaction};
use crate::elements::{BoundingRect, Element, ElementId, ElementPatch, Frame, SlideId, UserId};

/// Normalized snapshot of a slide.
#[derive(Debug, Clone, Default)]
pub struct ElementStore {
    slide_id: SlideId,
    elements: HashMap<ElementId, Element>,
    order: Vec<ElementId>,
    lock: Option<UserId>,
}

impl ElementStore {
    /// Take a fresh snapshot of `slide_id` from the document.
    pub fn load<D: ReplicatedDocument + ?Sized>(doc: &D, slide_id: &str) -> Self {
        Self::from_data(slide_id, doc.get_data(slide_id))
    }

    pub fn from_data(slide_id: impl Into<SlideId>, data: SlideData) -> Self {
        let SlideData {
            mut elements,
            order,
            lock,
        } = data;

        let order = normalize_order(&elements, order);
        let kinds: HashMap<ElementId, &'static str> = elements
            .iter()
            .map(|(id, element)| (id.clone(), element.type_name()))
            .collect();
        for element in elements.values_mut() {
            prune_relations(element, &kinds);
        }

        Self {
            slide_id: slide_id.into(),
            elements,
            order,
            lock,
        }
    }

    pub fn slide_id(&self) -> &SlideId {
        &self.slide_id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn frame(&self, id: &str) -> Option<&Frame> {
        self.get(id).and_then(Element::as_frame)
    }

    /// Element ids in paint order (back to front).
    pub fn element_ids(&self) -> &[ElementId] {
        &self.order
    }

    /// Elements in paint order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.order.iter().filter_map(|id| self.elements.get(id))
    }

    /// Frames in paint order.
    pub fn frames(&self) -> Vec<&Frame> {
        self.elements().filter_map(Element::as_frame).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Known ids of `ids` in paint order, without duplicates.
    pub fn sort_ids(&self, ids: &[ElementId]) -> Vec<ElementId> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.order
            .iter()
            .filter(|id| wanted.contains(id.as_str()))
            .cloned()
            .collect()
    }

    pub fn lock(&self) -> Option<&UserId> {
        self.lock.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Union of the bounds of every known element in `ids`.
    pub fn bounding_rect(&self, ids: &[ElementId]) -> Option<BoundingRect> {
        BoundingRect::of_elements(ids.iter().filter_map(|id| self.get(id)))
    }
}

fn normalize_order(elements: &HashMap<ElementId, Element>, order: Vec<ElementId>) -> Vec<ElementId> {
    let mut seen = HashSet::with_capacity(order.len());
    let mut normalized: Vec<ElementId> = order
        .into_iter()
        .filter(|id| elements.contains_key(id) && seen.insert(id.clone()))
        .collect();

    let mut missing: Vec<&ElementId> = elements.keys().filter(|id| !seen.contains(*id)).collect();
    if !missing.is_empty() {
        log::debug!("Appending {} elements missing from paint order", missing.len());
        missing.sort();
        normalized.extend(missing.into_iter().cloned());
    }
    normalized
}

fn prune_relations(element: &mut Element, kinds: &HashMap<ElementId, &'static str>) {
    let is = |id: &ElementId, kind: &str| kinds.get(id).is_some_and(|k| *k == kind);
    let keep = |slot: &mut Option<ElementId>, kind: &str| {
        if slot.as_ref().is_some_and(|id| !is(id, kind)) {
            *slot = None;
        }
    };

    match element {
        Element::Shape(shape) => {
            shape.connected_paths.retain(|id| is(id, "path"));
            keep(&mut shape.attached_frame, "frame");
        }
        Element::Path(path) => {
            keep(&mut path.connected_element_start, "shape");
            keep(&mut path.connected_element_end, "shape");
            keep(&mut path.attached_frame, "frame");
        }
        Element::Image(image) => keep(&mut image.attached_frame, "frame"),
        Element::Frame(frame) => {
            let mut seen = HashSet::new();
            frame
                .attached_elements
                .retain(|id| kinds.get(id).is_some_and(|k| *k != "frame") && seen.insert(id.clone()));
        }
    }
}

/// Working copies of the elements an operation patches.
///
/// Every staged patch is applied to a working copy immediately, so later
/// relation computations in the same operation see earlier ones. Patches to
/// one element merge into a single patch.
pub(crate) struct Staging<'a> {
    store: &'a ElementStore,
    working: HashMap<ElementId, Element>,
    patches: IndexMap<ElementId, ElementPatch>,
}

impl<'a> Staging<'a> {
    pub fn new(store: &'a ElementStore) -> Self {
        Self {
            store,
            working: HashMap::new(),
            patches: IndexMap::new(),
        }
    }

    /// Current view of an element: the working copy if staged, else the
    /// snapshot.
    pub fn get(&self, id: &str) -> Option<&Element> {
        self.working.get(id).or_else(|| self.store.get(id))
    }

    /// Stage a patch for an existing element. Unknown ids are ignored.
    pub fn stage(&mut self, id: &str, patch: ElementPatch) {
        if patch.is_empty() {
            return;
        }
        let Some(mut element) = self.get(id).cloned() else {
            log::debug!("Ignoring patch for unknown element {}", id);
            return;
        };
        patch.apply_to(&mut element);
        self.working.insert(id.to_string(), element);
        match self.patches.get_mut(id) {
            Some(existing) => existing.merge(patch),
            None => {
                self.patches.insert(id.to_string(), patch);
            }
        }
    }

    pub fn stage_all(&mut self, patches: impl IntoIterator<Item = (ElementId, ElementPatch)>) {
        for (id, patch) in patches {
            self.stage(&id, patch);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Queue every staged patch.
    pub fn write_to(self, txn: &mut Transaction) {
        for (id, patch) in self.patches {
            txn.patch(id, patch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Path, PathEnd, PathKind, Shape, ShapeKind};
    use kurbo::Point;

    fn rect(id: &str) -> Element {
        Shape::new(ShapeKind::Rectangle, Point::ZERO, 10.0, 10.0)
            .with_id(id)
            .into()
    }

    fn line(id: &str) -> Element {
        Path::new(PathKind::Line, Point::ZERO, vec![Point::ZERO, Point::new(5.0, 5.0)])
            .with_id(id)
            .into()
    }

    fn data(elements: Vec<Element>, order: &[&str]) -> SlideData {
        SlideData {
            elements: elements.into_iter().map(|e| (e.id().clone(), e)).collect(),
            order: order.iter().map(|id| id.to_string()).collect(),
            lock: None,
        }
    }

    #[test]
    fn test_order_is_normalized() {
        let store = ElementStore::from_data(
            "s",
            data(
                vec![rect("a"), rect("b"), rect("d"), rect("c")],
                &["b", "ghost", "a", "b"],
            ),
        );
        assert_eq!(store.element_ids(), ["b", "a", "c", "d"]);
    }

    #[test]
    fn test_dangling_relations_are_pruned() {
        let mut shape = Shape::new(ShapeKind::Circle, Point::ZERO, 1.0, 1.0).with_id("s1");
        shape.connected_paths = vec!["p1".into(), "gone".into(), "p1".into()];
        shape.attached_frame = Some("gone".into());
        let path = Path::new(PathKind::Line, Point::ZERO, vec![])
            .with_id("p1")
            .connected(PathEnd::Start, "s1")
            .connected(PathEnd::End, "gone");

        let store = ElementStore::from_data("s", data(vec![shape.into(), path.into()], &[]));

        let shape = store.get("s1").unwrap().as_shape().unwrap();
        assert_eq!(shape.connected_paths, vec!["p1", "p1"]);
        assert_eq!(shape.attached_frame, None);
        let path = store.get("p1").unwrap().as_path().unwrap();
        assert_eq!(path.connected_element_start.as_deref(), Some("s1"));
        assert_eq!(path.connected_element_end, None);
    }

    #[test]
    fn test_frames_never_attach_frames() {
        let mut outer = Frame::new(Point::ZERO, 100.0, 100.0).with_id("outer");
        outer.attached_elements = vec!["inner".into(), "a".into(), "a".into()];
        let inner = Frame::new(Point::ZERO, 10.0, 10.0).with_id("inner");

        let store = ElementStore::from_data(
            "s",
            data(vec![outer.into(), inner.into(), rect("a")], &["outer", "inner", "a"]),
        );
        assert_eq!(store.frame("outer").unwrap().attached_elements, vec!["a"]);
        assert_eq!(store.frames().len(), 2);
    }

    #[test]
    fn test_sort_ids_follows_paint_order() {
        let store = ElementStore::from_data("s", data(vec![rect("a"), rect("b"), rect("c")], &["a", "b", "c"]));
        let sorted = store.sort_ids(&["c".into(), "x".into(), "a".into(), "c".into()]);
        assert_eq!(sorted, vec!["a", "c"]);
    }

    #[test]
    fn test_staging_composes_patches() {
        let store = ElementStore::from_data("s", data(vec![rect("a"), line("l")], &["a", "l"]));
        let mut staging = Staging::new(&store);
        staging.stage("a", ElementPatch::new().connected_paths(vec!["l".into()]));
        staging.stage("a", ElementPatch::new().position(Point::new(1.0, 1.0)));
        staging.stage("ghost", ElementPatch::new().position(Point::new(1.0, 1.0)));

        let shape = staging.get("a").unwrap().as_shape().unwrap();
        assert_eq!(shape.connected_paths, vec!["l"]);
        assert_eq!(shape.position, Point::new(1.0, 1.0));

        let mut txn = Transaction::new("s");
        staging.write_to(&mut txn);
        assert_eq!(txn.len(), 1);
    }
}
