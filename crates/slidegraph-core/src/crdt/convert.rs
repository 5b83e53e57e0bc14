//! Conversion between elements and Loro values.

use kurbo::Point;
use loro::{LoroList, LoroMap, LoroMapValue, LoroResult, LoroValue};

use crate::elements::{
    Element, ElementId, ElementPatch, Frame, Image, Path, PathKind, SerializableColor, Shape,
    ShapeKind, Stroke, TextAlign, TextContent,
};

// Element type identifiers
const TYPE_SHAPE: &str = "shape";
const TYPE_PATH: &str = "path";
const TYPE_IMAGE: &str = "image";
const TYPE_FRAME: &str = "frame";

// Common keys
const KEY_TYPE: &str = "type";
const KEY_X: &str = "x";
const KEY_Y: &str = "y";
const KEY_WIDTH: &str = "width";
const KEY_HEIGHT: &str = "height";

// Shape keys
const KEY_KIND: &str = "kind";
const KEY_FILL: &str = "fill";
const KEY_STROKE_COLOR: &str = "stroke_color";
const KEY_STROKE_WIDTH: &str = "stroke_width";
const KEY_TEXT: &str = "text";
const KEY_TEXT_ALIGN: &str = "text_align";
const KEY_TEXT_COLOR: &str = "text_color";
const KEY_TEXT_BOLD: &str = "text_bold";
const KEY_TEXT_ITALIC: &str = "text_italic";
const KEY_TEXT_SIZE: &str = "text_size";

// Path keys
const KEY_POINTS: &str = "points";

// Image keys
const KEY_CONTENT_REF: &str = "content_ref";
const KEY_FILE_NAME: &str = "file_name";

// Relation keys
const KEY_CONNECTED_PATHS: &str = "connected_paths";
const KEY_CONNECTED_START: &str = "connected_element_start";
const KEY_CONNECTED_END: &str = "connected_element_end";
const KEY_ATTACHED_FRAME: &str = "attached_frame";
const KEY_ATTACHED_ELEMENTS: &str = "attached_elements";

const TEXT_KEYS: [&str; 6] = [
    KEY_TEXT,
    KEY_TEXT_ALIGN,
    KEY_TEXT_COLOR,
    KEY_TEXT_BOLD,
    KEY_TEXT_ITALIC,
    KEY_TEXT_SIZE,
];

// Helper functions to extract values from LoroMapValue (derefs to HashMap<String, LoroValue>)
fn get_double(map: &LoroMapValue, key: &str) -> Option<f64> {
    match map.get(key)? {
        LoroValue::Double(d) => Some(*d),
        LoroValue::I64(i) => Some(*i as f64),
        _ => None,
    }
}

fn get_string(map: &LoroMapValue, key: &str) -> Option<String> {
    match map.get(key)? {
        LoroValue::String(s) => Some(s.to_string()),
        _ => None,
    }
}

fn get_bool(map: &LoroMapValue, key: &str) -> Option<bool> {
    match map.get(key)? {
        LoroValue::Bool(b) => Some(*b),
        _ => None,
    }
}

fn get_color(map: &LoroMapValue, key: &str) -> Option<SerializableColor> {
    SerializableColor::from_hex(&get_string(map, key)?)
}

fn get_id_list(map: &LoroMapValue, key: &str) -> Vec<ElementId> {
    match map.get(key) {
        Some(LoroValue::List(list)) => list
            .iter()
            .filter_map(|value| match value {
                LoroValue::String(s) => Some(s.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn get_points(map: &LoroMapValue) -> Vec<Point> {
    let Some(LoroValue::List(points)) = map.get(KEY_POINTS) else {
        return Vec::new();
    };
    points
        .iter()
        .filter_map(|p| {
            let LoroValue::List(coords) = p else {
                return None;
            };
            let coord = |value: &LoroValue| match value {
                LoroValue::Double(d) => Some(*d),
                LoroValue::I64(i) => Some(*i as f64),
                _ => None,
            };
            Some(Point::new(coord(coords.first()?)?, coord(coords.get(1)?)?))
        })
        .collect()
}

fn set_optional_id(map: &LoroMap, key: &str, id: Option<&ElementId>) -> LoroResult<()> {
    match id {
        Some(id) => map.insert(key, id.clone()),
        None => map.delete(key),
    }
}

fn set_id_list(map: &LoroMap, key: &str, ids: &[ElementId]) -> LoroResult<()> {
    let list = map.insert_container(key, LoroList::new())?;
    for id in ids {
        list.push(id.clone())?;
    }
    Ok(())
}

fn set_points(map: &LoroMap, points: &[Point]) -> LoroResult<()> {
    let points_list = map.insert_container(KEY_POINTS, LoroList::new())?;
    for point in points {
        let point_list = points_list.insert_container(points_list.len(), LoroList::new())?;
        point_list.push(point.x)?;
        point_list.push(point.y)?;
    }
    Ok(())
}

fn set_stroke(map: &LoroMap, stroke: Option<&Stroke>) -> LoroResult<()> {
    match stroke {
        Some(stroke) => {
            map.insert(KEY_STROKE_COLOR, stroke.color.to_hex())?;
            map.insert(KEY_STROKE_WIDTH, stroke.width)
        }
        None => {
            map.delete(KEY_STROKE_COLOR)?;
            map.delete(KEY_STROKE_WIDTH)
        }
    }
}

fn set_text(map: &LoroMap, text: Option<&TextContent>) -> LoroResult<()> {
    match text {
        Some(text) => {
            map.insert(KEY_TEXT, text.content.clone())?;
            map.insert(KEY_TEXT_ALIGN, text.align.as_str())?;
            map.insert(KEY_TEXT_COLOR, text.color.to_hex())?;
            map.insert(KEY_TEXT_BOLD, text.bold)?;
            map.insert(KEY_TEXT_ITALIC, text.italic)?;
            map.insert(KEY_TEXT_SIZE, text.size)
        }
        None => {
            for key in TEXT_KEYS {
                map.delete(key)?;
            }
            Ok(())
        }
    }
}

/// Write every field of an element into an empty Loro map.
pub fn element_to_loro(element: &Element, map: &LoroMap) -> LoroResult<()> {
    map.insert(KEY_TYPE, element.type_name())?;
    let position = element.position();
    map.insert(KEY_X, position.x)?;
    map.insert(KEY_Y, position.y)?;

    match element {
        Element::Shape(shape) => {
            map.insert(KEY_KIND, shape.kind.as_str())?;
            map.insert(KEY_WIDTH, shape.width)?;
            map.insert(KEY_HEIGHT, shape.height)?;
            map.insert(KEY_FILL, shape.fill_color.to_hex())?;
            set_stroke(map, shape.stroke.as_ref())?;
            set_text(map, shape.text.as_ref())?;
            set_id_list(map, KEY_CONNECTED_PATHS, &shape.connected_paths)?;
            set_optional_id(map, KEY_ATTACHED_FRAME, shape.attached_frame.as_ref())?;
        }
        Element::Path(path) => {
            map.insert(KEY_KIND, path.kind.as_str())?;
            set_points(map, &path.points)?;
            map.insert(KEY_STROKE_COLOR, path.stroke_color.to_hex())?;
            set_optional_id(map, KEY_CONNECTED_START, path.connected_element_start.as_ref())?;
            set_optional_id(map, KEY_CONNECTED_END, path.connected_element_end.as_ref())?;
            set_optional_id(map, KEY_ATTACHED_FRAME, path.attached_frame.as_ref())?;
        }
        Element::Image(image) => {
            map.insert(KEY_WIDTH, image.width)?;
            map.insert(KEY_HEIGHT, image.height)?;
            map.insert(KEY_CONTENT_REF, image.content_ref.clone())?;
            map.insert(KEY_FILE_NAME, image.file_name.clone())?;
            set_optional_id(map, KEY_ATTACHED_FRAME, image.attached_frame.as_ref())?;
        }
        Element::Frame(frame) => {
            map.insert(KEY_WIDTH, frame.width)?;
            map.insert(KEY_HEIGHT, frame.height)?;
            set_id_list(map, KEY_ATTACHED_ELEMENTS, &frame.attached_elements)?;
        }
    }
    Ok(())
}

/// Write only the fields a patch carries. `element` is the current value and
/// decides which variant-specific keys apply.
pub fn patch_to_loro(element: &Element, patch: &ElementPatch, map: &LoroMap) -> LoroResult<()> {
    if let Some(position) = patch.position {
        map.insert(KEY_X, position.x)?;
        map.insert(KEY_Y, position.y)?;
    }

    let sized = !matches!(element, Element::Path(_));
    if sized {
        if let Some(width) = patch.width {
            map.insert(KEY_WIDTH, width)?;
        }
        if let Some(height) = patch.height {
            map.insert(KEY_HEIGHT, height)?;
        }
    }

    let attachable = element.is_attachable();
    if attachable {
        if let Some(frame) = &patch.attached_frame {
            set_optional_id(map, KEY_ATTACHED_FRAME, frame.as_ref())?;
        }
    }

    match element {
        Element::Shape(_) => {
            if let Some(kind) = patch.shape_kind {
                map.insert(KEY_KIND, kind.as_str())?;
            }
            if let Some(fill) = patch.fill_color {
                map.insert(KEY_FILL, fill.to_hex())?;
            }
            if let Some(stroke) = &patch.stroke {
                set_stroke(map, stroke.as_ref())?;
            }
            if let Some(text) = &patch.text {
                set_text(map, text.as_ref())?;
            }
            if let Some(paths) = &patch.connected_paths {
                set_id_list(map, KEY_CONNECTED_PATHS, paths)?;
            }
        }
        Element::Path(_) => {
            if let Some(kind) = patch.path_kind {
                map.insert(KEY_KIND, kind.as_str())?;
            }
            if let Some(points) = &patch.points {
                set_points(map, points)?;
            }
            if let Some(color) = patch.stroke_color {
                map.insert(KEY_STROKE_COLOR, color.to_hex())?;
            }
            if let Some(start) = &patch.connected_element_start {
                set_optional_id(map, KEY_CONNECTED_START, start.as_ref())?;
            }
            if let Some(end) = &patch.connected_element_end {
                set_optional_id(map, KEY_CONNECTED_END, end.as_ref())?;
            }
        }
        Element::Image(_) => {
            if let Some(content_ref) = &patch.content_ref {
                map.insert(KEY_CONTENT_REF, content_ref.clone())?;
            }
            if let Some(file_name) = &patch.file_name {
                map.insert(KEY_FILE_NAME, file_name.clone())?;
            }
        }
        Element::Frame(_) => {
            if let Some(attached) = &patch.attached_elements {
                set_id_list(map, KEY_ATTACHED_ELEMENTS, attached)?;
            }
        }
    }
    Ok(())
}

/// Convert a Loro map to an element. Returns `None` for unknown or
/// incomplete entries.
pub fn element_from_loro(id: &str, map: &LoroMapValue) -> Option<Element> {
    let element_type = get_string(map, KEY_TYPE)?;
    let position = Point::new(get_double(map, KEY_X)?, get_double(map, KEY_Y)?);

    match element_type.as_str() {
        TYPE_SHAPE => shape_from_loro(id, position, map),
        TYPE_PATH => path_from_loro(id, position, map),
        TYPE_IMAGE => image_from_loro(id, position, map),
        TYPE_FRAME => frame_from_loro(id, position, map),
        _ => None,
    }
}

fn shape_from_loro(id: &str, position: Point, map: &LoroMapValue) -> Option<Element> {
    let kind = get_string(map, KEY_KIND)
        .and_then(|k| ShapeKind::parse(&k))
        .unwrap_or_default();
    let mut shape = Shape::new(
        kind,
        position,
        get_double(map, KEY_WIDTH)?,
        get_double(map, KEY_HEIGHT)?,
    )
    .with_id(id);
    shape.fill_color = get_color(map, KEY_FILL).unwrap_or_else(SerializableColor::white);
    shape.stroke = get_color(map, KEY_STROKE_COLOR).map(|color| Stroke {
        color,
        width: get_double(map, KEY_STROKE_WIDTH).unwrap_or(1.0),
    });
    shape.text = get_string(map, KEY_TEXT).map(|content| TextContent {
        align: get_string(map, KEY_TEXT_ALIGN)
            .and_then(|a| TextAlign::parse(&a))
            .unwrap_or_default(),
        color: get_color(map, KEY_TEXT_COLOR).unwrap_or_default(),
        bold: get_bool(map, KEY_TEXT_BOLD).unwrap_or(false),
        italic: get_bool(map, KEY_TEXT_ITALIC).unwrap_or(false),
        size: get_double(map, KEY_TEXT_SIZE).unwrap_or(16.0),
        content,
    });
    shape.connected_paths = get_id_list(map, KEY_CONNECTED_PATHS);
    shape.attached_frame = get_string(map, KEY_ATTACHED_FRAME);
    Some(Element::Shape(shape))
}

fn path_from_loro(id: &str, position: Point, map: &LoroMapValue) -> Option<Element> {
    let kind = get_string(map, KEY_KIND)
        .and_then(|k| PathKind::parse(&k))
        .unwrap_or_default();
    let mut path = Path::new(kind, position, get_points(map)).with_id(id);
    path.stroke_color = get_color(map, KEY_STROKE_COLOR).unwrap_or_default();
    path.connected_element_start = get_string(map, KEY_CONNECTED_START);
    path.connected_element_end = get_string(map, KEY_CONNECTED_END);
    path.attached_frame = get_string(map, KEY_ATTACHED_FRAME);
    Some(Element::Path(path))
}

fn image_from_loro(id: &str, position: Point, map: &LoroMapValue) -> Option<Element> {
    let mut image = Image::new(
        position,
        get_double(map, KEY_WIDTH)?,
        get_double(map, KEY_HEIGHT)?,
        get_string(map, KEY_CONTENT_REF).unwrap_or_default(),
        get_string(map, KEY_FILE_NAME).unwrap_or_default(),
    )
    .with_id(id);
    image.attached_frame = get_string(map, KEY_ATTACHED_FRAME);
    Some(Element::Image(image))
}

fn frame_from_loro(id: &str, position: Point, map: &LoroMapValue) -> Option<Element> {
    let mut frame = Frame::new(
        position,
        get_double(map, KEY_WIDTH)?,
        get_double(map, KEY_HEIGHT)?,
    )
    .with_id(id);
    frame.attached_elements = get_id_list(map, KEY_ATTACHED_ELEMENTS);
    Some(Element::Frame(frame))
}
