//! Deep-merge primitives for cascading card/site configuration.
//!
//! Every effective configuration in the engine is recomputed on read from
//! layered partial configs. The merge rules here determine override
//! semantics for the whole system: objects merge key-wise recursively,
//! arrays and scalars replace wholesale, later layers win.

use serde_json::{Map, Value};
use uuid::Uuid;

/// Merges `overlay` into `base` in place.
///
/// Plain objects merge recursively; any other value (arrays included)
/// replaces the base value wholesale. `Null` overlay values are ignored so
/// a sparse layer cannot erase defaults.
pub fn merge_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => merge_values(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base_slot, overlay_value) => *base_slot = overlay_value.clone(),
    }
}

/// Merges configuration layers in order, later layers winning on conflict.
pub fn merge_config_layers(layers: &[&Value]) -> Value {
    let mut merged = Value::Object(Map::new());
    for layer in layers {
        merge_values(&mut merged, layer);
    }
    merged
}

/// Sets a dotted-path key inside `data`, creating intermediate objects.
///
/// A non-object value found mid-path is replaced by an object; the engine
/// treats path sets as authoritative partial writes.
pub fn set_nested(data: &mut Value, path: &str, value: Value) {
    if !data.is_object() {
        *data = Value::Object(Map::new());
    }
    let mut current = data;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let map = current
            .as_object_mut()
            .unwrap_or_else(|| unreachable!("slot normalized to object"));
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        let slot = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = slot;
    }
}

/// Reads a dotted-path key from `data`.
pub fn get_nested<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Converts a slug or camelCase key into a display label.
///
/// `sub-heading`, `sub_heading` and `subHeading` all become `Sub Heading`.
pub fn to_label(raw: &str) -> String {
    let mut spaced = String::with_capacity(raw.len() + 4);
    for ch in raw.chars() {
        match ch {
            '-' | '_' => spaced.push(' '),
            c if c.is_uppercase() => {
                if !spaced.is_empty() && !spaced.ends_with(' ') {
                    spaced.push(' ');
                }
                spaced.push(c);
            }
            c => spaced.push(c),
        }
    }
    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generates a prefixed unique object id, e.g. `crd_6fa459ea...`.
pub fn object_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}
