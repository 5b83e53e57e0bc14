//! Relation maintenance between elements.
//!
//! Pure functions that compute the patches needed to keep both sides of a
//! relation in sync. They never touch a document: callers stage the returned
//! patches and commit them in one transaction.
//!
//! Two relations exist:
//! - connections: a path end points at a shape, the shape lists the path in
//!   `connected_paths` (once per connected end),
//! - attachments: an element points at a frame, the frame lists the element
//!   in `attached_elements` exactly once.
//!
//! Every function returns no patch when nothing would change, so applying a
//! compensation against a state a peer already fixed is harmless.

use crate::elements::{Element, ElementId, ElementPatch, Frame, Path, PathEnd, Shape};

/// Connect `end` of `path` to `shape_id`. `None` when already connected
/// there.
pub fn connect_path(path: &Path, end: PathEnd, shape_id: &str) -> Option<ElementPatch> {
    if path.connection(end).is_some_and(|current| current == shape_id) {
        return None;
    }
    Some(ElementPatch::new().connection(end, Some(shape_id.to_string())))
}

/// Add `path_id` to the shape's connected paths. Duplicates are kept: a path
/// connected to the same shape at both ends is listed twice.
pub fn connect_shape(shape: &Shape, path_id: &str) -> ElementPatch {
    let mut paths = shape.connected_paths.clone();
    paths.push(path_id.to_string());
    ElementPatch::new().connected_paths(paths)
}

/// Clear one end of a path if it is set.
pub fn disconnect_path_at(path: &Path, end: PathEnd) -> Option<ElementPatch> {
    path.connection(end)?;
    Some(ElementPatch::new().connection(end, None))
}

/// Clear the ends of `path` connected to any of `element_ids`, or both ends
/// when `element_ids` is `None`.
pub fn disconnect_path(path: &Path, element_ids: Option<&[ElementId]>) -> Option<ElementPatch> {
    let mut patch = ElementPatch::new();
    for end in PathEnd::BOTH {
        let Some(current) = path.connection(end) else {
            continue;
        };
        if element_ids.is_none_or(|ids| ids.contains(current)) {
            patch = patch.connection(end, None);
        }
    }
    (!patch.is_empty()).then_some(patch)
}

/// Drop entries of `element_ids` from the shape's connected paths, or every
/// entry when `element_ids` is `None`.
///
/// By default one occurrence is removed per listed id, matching one
/// disconnected path end. `remove_all` drops every occurrence, which is what
/// deleting the path requires.
pub fn disconnect_shape(
    shape: &Shape,
    element_ids: Option<&[ElementId]>,
    remove_all: bool,
) -> Option<ElementPatch> {
    let Some(ids) = element_ids else {
        if shape.connected_paths.is_empty() {
            return None;
        }
        return Some(ElementPatch::new().connected_paths(Vec::new()));
    };

    let mut paths = shape.connected_paths.clone();
    for id in ids {
        if remove_all {
            paths.retain(|other| other != id);
        } else if let Some(index) = paths.iter().position(|other| other == id) {
            paths.remove(index);
        }
    }

    if paths == shape.connected_paths {
        return None;
    }
    Some(ElementPatch::new().connected_paths(paths))
}

/// Patches that attach `element` to `frame`.
///
/// When the element is currently attached to `previous_frame`, that frame
/// loses it in the same batch. Frames are never attached, and attaching to
/// the frame the element is already in yields no patches.
pub fn attach_to_frame(
    element: &Element,
    frame: &Frame,
    previous_frame: Option<&Frame>,
) -> Vec<(ElementId, ElementPatch)> {
    let mut patches = Vec::new();
    if !element.is_attachable() {
        return patches;
    }
    let element_id = element.id();

    if element.attached_frame() != Some(&frame.id) {
        patches.push((
            element_id.clone(),
            ElementPatch::new().attached_frame(Some(frame.id.clone())),
        ));
    }
    if !frame.is_attached(element_id) {
        let mut attached = frame.attached_elements.clone();
        attached.push(element_id.clone());
        patches.push((frame.id.clone(), ElementPatch::new().attached_elements(attached)));
    }
    if let Some(previous) = previous_frame.filter(|previous| previous.id != frame.id) {
        if let Some(patch) = remove_attachment(previous, element_id) {
            patches.push((previous.id.clone(), patch));
        }
    }
    patches
}

/// Patches that detach `element` from its frame. `frame` is the frame it is
/// attached to, when it still exists.
pub fn detach_from_frame(element: &Element, frame: Option<&Frame>) -> Vec<(ElementId, ElementPatch)> {
    let mut patches = Vec::new();
    if element.attached_frame().is_some() {
        patches.push((element.id().clone(), ElementPatch::new().attached_frame(None)));
    }
    if let Some(frame) = frame {
        if let Some(patch) = remove_attachment(frame, element.id()) {
            patches.push((frame.id.clone(), patch));
        }
    }
    patches
}

/// Patch removing `element_id` from the frame's attached elements, if
/// listed.
pub fn remove_attachment(frame: &Frame, element_id: &str) -> Option<ElementPatch> {
    if !frame.is_attached(element_id) {
        return None;
    }
    let attached = frame
        .attached_elements
        .iter()
        .filter(|id| *id != element_id)
        .cloned()
        .collect();
    Some(ElementPatch::new().attached_elements(attached))
}

/// Patch dropping every reference `element` holds to one of `removed`.
///
/// Shapes lose every occurrence of a removed path, paths disconnect the ends
/// that pointed at a removed shape, frames forget removed elements, and
/// elements attached to a removed frame are detached.
pub fn compensate_removal(element: &Element, removed: &[ElementId]) -> Option<ElementPatch> {
    if !element.relation_targets().iter().any(|id| removed.contains(id)) {
        return None;
    }
    let mut patch = match element {
        Element::Shape(shape) => disconnect_shape(shape, Some(removed), true).unwrap_or_default(),
        Element::Path(path) => disconnect_path(path, Some(removed)).unwrap_or_default(),
        Element::Frame(frame) => {
            let attached: Vec<ElementId> = frame
                .attached_elements
                .iter()
                .filter(|id| !removed.contains(id))
                .cloned()
                .collect();
            if attached.len() == frame.attached_elements.len() {
                ElementPatch::new()
            } else {
                ElementPatch::new().attached_elements(attached)
            }
        }
        Element::Image(_) => ElementPatch::new(),
    };
    if element.attached_frame().is_some_and(|frame| removed.contains(frame)) {
        patch = patch.attached_frame(None);
    }
    (!patch.is_empty()).then_some(patch)
}

/// Frame an element should be attached to based on its position.
///
/// The element's bounding rect must lie fully inside the frame, edges
/// included. Path bounds cover every point. When several frames qualify, the
/// last one in `frames` (the topmost in paint order) wins.
pub fn find_frame_for_position<'a>(
    element: &Element,
    frames: impl IntoIterator<Item = &'a Frame>,
) -> Option<ElementId> {
    if !element.is_attachable() {
        return None;
    }
    let bounds = element.bounds();
    frames
        .into_iter()
        .filter(|frame| frame.contains_rect(bounds))
        .last()
        .map(|frame| frame.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Image, PathKind, ShapeKind};
    use kurbo::Point;

    fn shape(id: &str) -> Shape {
        Shape::new(ShapeKind::Rectangle, Point::new(10.0, 10.0), 20.0, 20.0).with_id(id)
    }

    fn line(id: &str) -> Path {
        Path::new(
            PathKind::Line,
            Point::new(0.0, 0.0),
            vec![Point::new(0.0, 0.0), Point::new(50.0, 50.0)],
        )
        .with_id(id)
    }

    fn frame(id: &str, x: f64, y: f64, size: f64) -> Frame {
        Frame::new(Point::new(x, y), size, size).with_id(id)
    }

    #[test]
    fn test_connect_path_is_idempotent() {
        let path = line("p").connected(PathEnd::Start, "s");
        assert!(connect_path(&path, PathEnd::Start, "s").is_none());

        let patch = connect_path(&path, PathEnd::End, "s").unwrap();
        assert_eq!(patch.connected_element_end, Some(Some("s".to_string())));

        let patch = connect_path(&path, PathEnd::Start, "t").unwrap();
        assert_eq!(patch.connected_element_start, Some(Some("t".to_string())));
    }

    #[test]
    fn test_connect_shape_keeps_duplicates() {
        let mut s = shape("s");
        s.connected_paths = vec!["p".into()];
        let patch = connect_shape(&s, "p");
        assert_eq!(patch.connected_paths, Some(vec!["p".into(), "p".into()]));
    }

    #[test]
    fn test_disconnect_path_at_only_when_set() {
        let path = line("p").connected(PathEnd::End, "s");
        assert!(disconnect_path_at(&path, PathEnd::Start).is_none());
        let patch = disconnect_path_at(&path, PathEnd::End).unwrap();
        assert_eq!(patch.connected_element_end, Some(None));
    }

    #[test]
    fn test_disconnect_path_by_ids() {
        let path = line("p")
            .connected(PathEnd::Start, "a")
            .connected(PathEnd::End, "b");

        let patch = disconnect_path(&path, Some(&["b".to_string()])).unwrap();
        assert_eq!(patch.connected_element_start, None);
        assert_eq!(patch.connected_element_end, Some(None));

        let patch = disconnect_path(&path, None).unwrap();
        assert_eq!(patch.connected_element_start, Some(None));
        assert_eq!(patch.connected_element_end, Some(None));

        assert!(disconnect_path(&path, Some(&["c".to_string()])).is_none());
        assert!(disconnect_path(&line("q"), None).is_none());
    }

    #[test]
    fn test_disconnect_shape_once_vs_all() {
        let mut s = shape("s");
        s.connected_paths = vec!["p".into(), "q".into(), "p".into()];
        let ids = ["p".to_string()];

        let once = disconnect_shape(&s, Some(&ids), false).unwrap();
        assert_eq!(once.connected_paths, Some(vec!["q".into(), "p".into()]));

        let all = disconnect_shape(&s, Some(&ids), true).unwrap();
        assert_eq!(all.connected_paths, Some(vec!["q".into()]));

        let cleared = disconnect_shape(&s, None, false).unwrap();
        assert_eq!(cleared.connected_paths, Some(Vec::new()));

        assert!(disconnect_shape(&s, Some(&["x".to_string()]), true).is_none());
        assert!(disconnect_shape(&shape("empty"), None, false).is_none());
    }

    #[test]
    fn test_attach_to_frame_pairs_patches() {
        let element: Element = shape("s").into();
        let f = frame("f", 0.0, 0.0, 100.0);

        let patches = attach_to_frame(&element, &f, None);
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].0, "s");
        assert_eq!(patches[0].1.attached_frame, Some(Some("f".to_string())));
        assert_eq!(patches[1].0, "f");
        assert_eq!(patches[1].1.attached_elements, Some(vec!["s".to_string()]));
    }

    #[test]
    fn test_attach_twice_is_noop() {
        let mut s = shape("s");
        s.attached_frame = Some("f".into());
        let mut f = frame("f", 0.0, 0.0, 100.0);
        f.attached_elements = vec!["s".into()];

        assert!(attach_to_frame(&Element::from(s), &f, Some(&f)).is_empty());
    }

    #[test]
    fn test_attach_moves_between_frames() {
        let mut s = shape("s");
        s.attached_frame = Some("old".into());
        let mut old = frame("old", 0.0, 0.0, 100.0);
        old.attached_elements = vec!["x".into(), "s".into()];
        let new = frame("new", 0.0, 0.0, 200.0);

        let patches = attach_to_frame(&Element::from(s), &new, Some(&old));
        assert_eq!(patches.len(), 3);
        assert_eq!(patches[2].0, "old");
        assert_eq!(patches[2].1.attached_elements, Some(vec!["x".to_string()]));
    }

    #[test]
    fn test_frames_are_not_attachable() {
        let inner: Element = frame("inner", 10.0, 10.0, 10.0).into();
        let outer = frame("outer", 0.0, 0.0, 100.0);
        assert!(attach_to_frame(&inner, &outer, None).is_empty());
        assert_eq!(find_frame_for_position(&inner, [&outer]), None);
    }

    #[test]
    fn test_detach_from_frame() {
        let mut image = Image::new(Point::ZERO, 10.0, 10.0, "blob:1", "cat.png").with_id("i");
        image.attached_frame = Some("f".into());
        let mut f = frame("f", 0.0, 0.0, 100.0);
        f.attached_elements = vec!["i".into()];

        let patches = detach_from_frame(&Element::from(image), Some(&f));
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].1.attached_frame, Some(None));
        assert_eq!(patches[1].1.attached_elements, Some(Vec::new()));

        assert!(detach_from_frame(&shape("s").into(), None).is_empty());
    }

    #[test]
    fn test_compensate_removal() {
        let removed = ["s".to_string(), "f".to_string()];

        let path = line("p")
            .connected(PathEnd::Start, "s")
            .connected(PathEnd::End, "t");
        let patch = compensate_removal(&path.into(), &removed).unwrap();
        assert_eq!(patch.connected_element_start, Some(None));
        assert_eq!(patch.connected_element_end, None);

        let mut image = Image::new(Point::ZERO, 1.0, 1.0, "ref", "a.png").with_id("i");
        image.attached_frame = Some("f".into());
        let patch = compensate_removal(&image.into(), &removed).unwrap();
        assert_eq!(patch.attached_frame, Some(None));

        let mut other = frame("g", 0.0, 0.0, 10.0);
        other.attached_elements = vec!["s".into(), "i".into()];
        let patch = compensate_removal(&other.into(), &removed).unwrap();
        assert_eq!(patch.attached_elements, Some(vec!["i".to_string()]));

        assert!(compensate_removal(&shape("t").into(), &removed).is_none());
    }

    #[test]
    fn test_find_frame_prefers_topmost() {
        let element: Element = shape("s").into();
        let bottom = frame("bottom", 0.0, 0.0, 100.0);
        let top = frame("top", 5.0, 5.0, 50.0);
        let elsewhere = frame("elsewhere", 500.0, 500.0, 10.0);

        let found = find_frame_for_position(&element, [&bottom, &top, &elsewhere]);
        assert_eq!(found.as_deref(), Some("top"));
    }

    #[test]
    fn test_find_frame_requires_full_containment() {
        let f = frame("f", 0.0, 0.0, 40.0);
        // Path reaches (50, 50), outside the frame
        assert_eq!(find_frame_for_position(&line("p").into(), [&f]), None);
        // Shape spans 10..30, edges inside
        let exact = frame("exact", 10.0, 10.0, 20.0);
        assert_eq!(
            find_frame_for_position(&shape("s").into(), [&exact]).as_deref(),
            Some("exact")
        );
    }
}
