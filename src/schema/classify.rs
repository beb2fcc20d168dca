//! Node classification
//!
//! Turns a raw JSON node into a [`SchemaProperty`]. The `type` tag selects the
//! payload; when it is absent the tag is guessed from the keys present. Keys
//! that are neither common nor known to the selected payload are rejected,
//! except for keys that would only have selected a lower-ranked guess.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{
    ArrayProperty, BooleanProperty, ChoicesProperty, FunctionProperty, NumberProperty, ObjectProperty,
    PropertyCommon, PropertyKind, SchemaProperty, StringProperty, ValueProperty,
};
use crate::error::{Result, SchemaError};

/// Keys that select a tag on an untagged node, highest precedence first
const GUESS_ORDER: [(&str, &str); 4] = [
    ("choices", "choices"),
    ("properties", "object"),
    ("value", "value"),
    ("$ref", "ref"),
];

/// Infer a tag from the keys of an untagged node
pub fn guess_tag(map: &Map<String, Value>) -> Option<&'static str> {
    GUESS_ORDER
        .iter()
        .find(|(key, _)| map.contains_key(*key))
        .map(|(_, tag)| *tag)
}

/// Drop the payload keys of guesses ranked below `tag`. `$ref` is a common key
/// and stays.
fn drop_shadowed_keys(map: &mut Map<String, Value>, tag: &str) {
    let shadowed = GUESS_ORDER.iter().skip_while(|(_, t)| *t != tag).skip(1);
    for (key, _) in shadowed {
        if PropertyCommon::KEYS.contains(key) {
            continue;
        }
        if map.remove(*key).is_some() {
            tracing::warn!(key, tag, "dropping key shadowed by the guessed type");
        }
    }
}

/// Classify a raw JSON node, guessing its tag when needed
pub fn classify(value: Value) -> Result<SchemaProperty> {
    let mut map = match value {
        Value::Object(map) => map,
        other => {
            return Err(SchemaError::InvalidFormat(format!(
                "schema node must be an object, got {other}"
            )))
        }
    };

    let tag = match map.remove("type") {
        Some(Value::String(tag)) => Some(tag),
        Some(other) => return Err(SchemaError::UnknownType(other.to_string())),
        None => {
            let guessed = guess_tag(&map);
            if let Some(tag) = guessed {
                drop_shadowed_keys(&mut map, tag);
            }
            guessed.map(str::to_string)
        }
    };

    let (common, rest) = split_common(map);
    let common: PropertyCommon = from_map(common)?;

    let kind = match tag.as_deref() {
        None => PropertyKind::Untyped(rest),
        Some(tag) => build_kind(tag, rest)?,
    };

    Ok(SchemaProperty { common, kind })
}

/// Reclassify a node whose tag could not be guessed at ingestion. Typed nodes are
/// returned untouched. With `strict`, a node that still has no guessable tag is
/// an error.
pub fn reclassify(node: SchemaProperty, strict: bool) -> Result<SchemaProperty> {
    if !matches!(node.kind, PropertyKind::Untyped(_)) {
        return Ok(node);
    }
    let value = node.to_value()?;
    let node = classify(value.clone())?;
    if strict && matches!(node.kind, PropertyKind::Untyped(_)) {
        return Err(SchemaError::InvalidFormat(format!(
            "Could not guess type for {value}"
        )));
    }
    Ok(node)
}

fn split_common(map: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut common = Map::new();
    let mut rest = Map::new();
    for (key, value) in map {
        if PropertyCommon::KEYS.contains(&key.as_str()) {
            common.insert(key, value);
        } else {
            rest.insert(key, value);
        }
    }
    (common, rest)
}

fn check_keys(tag: &str, rest: &Map<String, Value>, allowed: &[&str]) -> Result<()> {
    match rest.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(SchemaError::UnknownKey {
            key: key.clone(),
            kind: tag.to_string(),
        }),
        None => Ok(()),
    }
}

fn payload<T: DeserializeOwned>(tag: &str, rest: Map<String, Value>, allowed: &[&str]) -> Result<T> {
    check_keys(tag, &rest, allowed)?;
    from_map(rest)
}

fn from_map<T: DeserializeOwned>(map: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(map)).map_err(|e| SchemaError::InvalidFormat(e.to_string()))
}

fn build_kind(tag: &str, rest: Map<String, Value>) -> Result<PropertyKind> {
    Ok(match tag {
        "choices" => PropertyKind::Choices(payload::<ChoicesProperty>(tag, rest, ChoicesProperty::KEYS)?),
        "any" => {
            check_keys(tag, &rest, &[])?;
            PropertyKind::Any
        }
        "ref" => {
            check_keys(tag, &rest, &[])?;
            PropertyKind::Ref
        }
        "null" => {
            check_keys(tag, &rest, &[])?;
            PropertyKind::Null
        }
        "value" => PropertyKind::Value(payload::<ValueProperty>(tag, rest, ValueProperty::KEYS)?),
        "string" => PropertyKind::String(payload::<StringProperty>(tag, rest, StringProperty::KEYS)?),
        "object" => PropertyKind::Object(payload::<ObjectProperty>(tag, rest, ObjectProperty::KEYS)?),
        "binary" => PropertyKind::Binary(payload::<ObjectProperty>(tag, rest, ObjectProperty::KEYS)?),
        "number" => PropertyKind::Number(payload::<NumberProperty>(tag, rest, NumberProperty::KEYS)?),
        "integer" => PropertyKind::Integer(payload::<NumberProperty>(tag, rest, NumberProperty::KEYS)?),
        "boolean" => PropertyKind::Boolean(payload::<BooleanProperty>(tag, rest, BooleanProperty::KEYS)?),
        "array" => PropertyKind::Array(payload::<ArrayProperty>(tag, rest, ArrayProperty::KEYS)?),
        "function" => PropertyKind::Function(payload::<FunctionProperty>(tag, rest, FunctionProperty::KEYS)?),
        other => return Err(SchemaError::UnknownType(other.to_string())),
    })
}
