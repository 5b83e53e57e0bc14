//! Reactive projections of slide state.
//!
//! One canonical change feed (the document's broadcast channel) is fanned
//! out into a `watch` channel per concern. Values are only sent when they
//! differ from the previous one, and dropping a receiver cancels that
//! subscription.

use std::collections::HashMap;

use tokio::sync::watch;

use crate::elements::{Element, ElementId, Frame, UserId};
use crate::selection::SelectionState;
use crate::store::ElementStore;

/// Send `value` only when it differs from the current one.
fn publish<T: PartialEq>(sender: &watch::Sender<T>, value: T) -> bool {
    sender.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    })
}

/// Watch senders for every projection of one slide.
pub(crate) struct Projections {
    element_ids: watch::Sender<Vec<ElementId>>,
    frames: watch::Sender<Vec<Frame>>,
    lock: watch::Sender<Option<UserId>>,
    active_element_ids: watch::Sender<Vec<ElementId>>,
    active_element_id: watch::Sender<Option<ElementId>>,
    elements: HashMap<ElementId, watch::Sender<Option<Element>>>,
}

impl Projections {
    pub fn new(store: &ElementStore, selection: &SelectionState) -> Self {
        Self {
            element_ids: watch::Sender::new(store.element_ids().to_vec()),
            frames: watch::Sender::new(store.frames().into_iter().cloned().collect()),
            lock: watch::Sender::new(store.lock().cloned()),
            active_element_ids: watch::Sender::new(selection.ids().to_vec()),
            active_element_id: watch::Sender::new(selection.active_id().cloned()),
            elements: HashMap::new(),
        }
    }

    /// Push the current store state to every projection.
    pub fn refresh(&mut self, store: &ElementStore) {
        publish(&self.element_ids, store.element_ids().to_vec());
        publish(&self.frames, store.frames().into_iter().cloned().collect());
        publish(&self.lock, store.lock().cloned());

        self.elements.retain(|id, sender| {
            if sender.is_closed() {
                log::debug!("Dropping closed element subscription {}", id);
                return false;
            }
            publish(sender, store.get(id).cloned());
            true
        });
    }

    pub fn publish_selection(&self, selection: &SelectionState) {
        publish(&self.active_element_ids, selection.ids().to_vec());
        publish(&self.active_element_id, selection.active_id().cloned());
    }

    pub fn element_ids(&self) -> watch::Receiver<Vec<ElementId>> {
        self.element_ids.subscribe()
    }

    pub fn frames(&self) -> watch::Receiver<Vec<Frame>> {
        self.frames.subscribe()
    }

    pub fn lock(&self) -> watch::Receiver<Option<UserId>> {
        self.lock.subscribe()
    }

    pub fn active_element_ids(&self) -> watch::Receiver<Vec<ElementId>> {
        self.active_element_ids.subscribe()
    }

    pub fn active_element_id(&self) -> watch::Receiver<Option<ElementId>> {
        self.active_element_id.subscribe()
    }

    /// Subscribe to one element. Yields `None` while the element does not
    /// exist.
    pub fn element(&mut self, id: &str, store: &ElementStore) -> watch::Receiver<Option<Element>> {
        if let Some(sender) = self.elements.get(id) {
            return sender.subscribe();
        }
        let (sender, receiver) = watch::channel(store.get(id).cloned());
        self.elements.insert(id.to_string(), sender);
        receiver
    }

    /// Number of live per-element subscriptions.
    pub fn element_subscriptions(&self) -> usize {
        self.elements.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crdt::SlideData;
    use crate::elements::{Shape, ShapeKind};
    use kurbo::Point;

    fn store(ids: &[&str]) -> ElementStore {
        let elements = ids
            .iter()
            .map(|id| {
                let element: Element = Shape::new(ShapeKind::Rectangle, Point::ZERO, 1.0, 1.0)
                    .with_id(*id)
                    .into();
                (id.to_string(), element)
            })
            .collect();
        ElementStore::from_data(
            "s",
            SlideData {
                elements,
                order: ids.iter().map(|id| id.to_string()).collect(),
                lock: None,
            },
        )
    }

    #[test]
    fn test_only_distinct_values_are_sent() {
        let selection = SelectionState::new("s");
        let mut projections = Projections::new(&store(&["a"]), &selection);
        let mut ids = projections.element_ids();
        ids.mark_unchanged();

        projections.refresh(&store(&["a"]));
        assert!(!ids.has_changed().unwrap());

        projections.refresh(&store(&["a", "b"]));
        assert!(ids.has_changed().unwrap());
        assert_eq!(*ids.borrow_and_update(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_element_subscription_is_pruned_on_drop() {
        let selection = SelectionState::new("s");
        let current = store(&["a"]);
        let mut projections = Projections::new(&current, &selection);

        let element = projections.element("a", &current);
        assert!(element.borrow().is_some());
        assert_eq!(projections.element_subscriptions(), 1);

        drop(element);
        projections.refresh(&store(&[]));
        assert_eq!(projections.element_subscriptions(), 0);
    }

    #[test]
    fn test_removed_element_yields_none() {
        let selection = SelectionState::new("s");
        let current = store(&["a"]);
        let mut projections = Projections::new(&current, &selection);
        let mut element = projections.element("a", &current);

        projections.refresh(&store(&[]));
        assert!(element.has_changed().unwrap());
        assert!(element.borrow_and_update().is_none());
    }
}
