//! Hoists inline object and enum definitions into named namespace types
//!
//! Function parameters, return values, properties and type members often define
//! an object or a string enum in place. Each of these becomes a new entry in the
//! namespace's `types` and the inline definition is replaced by a `ref` to it.
//!
//! Names follow the path to the member: the enclosing function, property or type
//! name, then the member name, in upper camel case with a `Type` or `Enum`
//! suffix. A parameter `foo` of function `bar` becomes `BarFooType`. A return
//! value is named after its function too, `<Function>ReturnType`, so two
//! functions never share one hoisted return type.
//!
//! The member-level fields `name`, `optional`, `optionalNull` and
//! `skipableParameter` move to the replacing ref and are removed from the
//! hoisted type. Its `description` is kept on both.
//!
//! Parameters and properties that are maps over a ref stay inline. Members of a
//! named type stay inline when they are maps over a typed array or carry
//! `patternProperties`; other maps become named types of their own.

use crate::error::{Result, SchemaError};
use crate::names::{combine_name_prefix, to_upper_camel_case};
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::schema::{AdditionalProperties, ObjectProperty, PropertyKind, SchemaEntry, SchemaProperty};
use crate::visitor::{SchemaVisitor, Visit};

use super::Fix;

pub struct ExtractInlineContent;

impl Fix for ExtractInlineContent {
    fn name(&self) -> &'static str {
        "extract inline content"
    }

    fn visitor<'a>(
        &'a self,
        _namespace: &ImportedNamespace,
        _namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        Ok(Some(Box::new(InlineExtractor)))
    }
}

struct InlineExtractor;

impl SchemaVisitor for InlineExtractor {
    fn visit_namespace(&mut self, entry: SchemaEntry) -> Result<Visit<SchemaEntry>> {
        Ok(Visit::Keep(extract_entry(entry)?))
    }
}

/// Extract every inline definition of `entry`
pub fn extract_entry(mut entry: SchemaEntry) -> Result<SchemaEntry> {
    let mut hoisted = Vec::new();

    for list in [&mut entry.functions, &mut entry.events] {
        for function in list.iter_mut().flatten() {
            extract_function_members(function, &mut hoisted)?;
        }
    }

    if let Some(properties) = entry.properties.take() {
        let mut extracted = indexmap::IndexMap::with_capacity(properties.len());
        for (key, property) in properties {
            let property = extract_namespace_property(&key, property, &mut hoisted)?;
            extracted.insert(key, property);
        }
        entry.properties = Some(extracted);
    }
    entry.types_mut().append(&mut hoisted);

    // Types hoisted above are visited too; types hoisted from here on are not
    let types = std::mem::take(entry.types_mut());
    let mut visited = Vec::with_capacity(types.len());
    for node in types {
        let id = node
            .common
            .id
            .clone()
            .ok_or_else(|| SchemaError::MissingName("namespace type without an id".to_string()))?;
        visited.push(extract_member(node, &to_upper_camel_case(&id), true, &mut hoisted)?);
    }
    visited.append(&mut hoisted);
    entry.types = Some(visited);

    Ok(entry)
}

/// Replace `node` by a ref to it, registering it as type `id`
fn convert_to_ref(mut node: SchemaProperty, id: String, hoisted: &mut Vec<SchemaProperty>) -> SchemaProperty {
    let mut reference = SchemaProperty::reference(id.clone());
    move_member_fields(&mut node, &mut reference);
    node.common.id = Some(id);
    tracing::debug!(id = ?node.common.id, "hoisted inline type");
    hoisted.push(node);
    reference
}

/// Replace a map whose values are inline objects by a map over a ref to the
/// value type, registered as `id`
fn convert_to_nested_ref(
    mut node: SchemaProperty,
    mut value: SchemaProperty,
    id: String,
    hoisted: &mut Vec<SchemaProperty>,
) -> SchemaProperty {
    let mut map = SchemaProperty::new(PropertyKind::Object(ObjectProperty {
        additional_properties: Some(AdditionalProperties::Schema(Box::new(SchemaProperty::reference(
            id.clone(),
        )))),
        ..ObjectProperty::default()
    }));
    move_member_fields(&mut node, &mut map);
    value.common.name = None;
    value.common.id = Some(id);
    tracing::debug!(id = ?value.common.id, "hoisted map value type");
    hoisted.push(value);
    map
}

/// The fields that describe the member rather than its type
fn move_member_fields(from: &mut SchemaProperty, to: &mut SchemaProperty) {
    to.common.name = from.common.name.take();
    to.common.description = from.common.description.clone();
    to.common.optional = std::mem::take(&mut from.common.optional);
    to.common.optional_null = std::mem::take(&mut from.common.optional_null);
    to.common.skipable_parameter = std::mem::take(&mut from.common.skipable_parameter);
}

fn required_prefix(prefix: Option<&str>) -> Result<&str> {
    prefix
        .filter(|p| !p.is_empty())
        .ok_or_else(|| SchemaError::MissingName("no name prefix for an inline type".to_string()))
}

fn parameter_name(parameter: &SchemaProperty) -> Result<String> {
    parameter
        .common
        .name
        .clone()
        .ok_or_else(|| SchemaError::MissingName("parameter without a name".to_string()))
}

/// An object that renders as a map type and is left inline
fn is_ref_map(object: &ObjectProperty) -> bool {
    object.properties.is_none()
        && object
            .additional_schema()
            .is_some_and(|schema| schema.common.reference.is_some())
}

/// Hoist `node` if it is an inline object or enum. Unions, arrays and callbacks
/// are searched for such definitions.
fn convert_to_ref_if_object(
    mut node: SchemaProperty,
    name: &str,
    prefix: Option<&str>,
    hoisted: &mut Vec<SchemaProperty>,
) -> Result<SchemaProperty> {
    match &mut node.kind {
        PropertyKind::Object(object) if is_ref_map(object) => Ok(node),
        PropertyKind::Object(object) if object.is_instance_of.is_none() && object.pattern_properties.is_none() => {
            let full = combine_name_prefix(required_prefix(prefix)?, Some(name));
            let id = format!("{}Type", to_upper_camel_case(&full));
            Ok(convert_to_ref(node, id, hoisted))
        }
        PropertyKind::String(string) if string.enumeration.is_some() => {
            let full = combine_name_prefix(required_prefix(prefix)?, Some(name));
            let id = format!("{}Enum", to_upper_camel_case(&full));
            Ok(convert_to_ref(node, id, hoisted))
        }
        PropertyKind::Choices(choices) => {
            if let Some(arms) = choices.choices.take() {
                let single = arms.len() == 1;
                let mut converted = Vec::with_capacity(arms.len());
                for (i, arm) in arms.into_iter().enumerate() {
                    let arm_name = if single { name.to_string() } else { format!("{name}C{}", i + 1) };
                    converted.push(convert_to_ref_if_object(arm, &arm_name, prefix, hoisted)?);
                }
                choices.choices = Some(converted);
            }
            Ok(node)
        }
        PropertyKind::Array(array) => {
            if let Some(items) = array.items.take() {
                let item_name = format!("{name}Item");
                array.items = Some(Box::new(convert_to_ref_if_object(*items, &item_name, prefix, hoisted)?));
            }
            Ok(node)
        }
        PropertyKind::Function(function) => {
            if let Some(parameters) = function.parameters.take() {
                let mut converted = Vec::with_capacity(parameters.len());
                for parameter in parameters {
                    let parameter_name = format!("{name}{}", to_upper_camel_case(&parameter_name(&parameter)?));
                    converted.push(convert_to_ref_if_object(parameter, &parameter_name, prefix, hoisted)?);
                }
                function.parameters = Some(converted);
            }
            Ok(node)
        }
        _ => Ok(node),
    }
}

/// Parameters and return value of a namespace function or event
fn extract_function_members(function: &mut SchemaProperty, hoisted: &mut Vec<SchemaProperty>) -> Result<()> {
    let prefix = function.common.name.clone();
    let Some(members) = function.as_function_mut() else {
        return Ok(());
    };

    if let Some(parameters) = members.parameters.take() {
        let mut converted = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let name = parameter_name(&parameter)?;
            converted.push(convert_to_ref_if_object(parameter, &name, prefix.as_deref(), hoisted)?);
        }
        members.parameters = Some(converted);
    }
    if let Some(returns) = members.returns.take() {
        members.returns = Some(Box::new(convert_to_ref_if_object(
            *returns,
            "return",
            prefix.as_deref(),
            hoisted,
        )?));
    }
    Ok(())
}

/// A namespace-level property. One that both refs a type and adds properties
/// becomes an object over the referenced type.
fn extract_namespace_property(
    key: &str,
    mut property: SchemaProperty,
    hoisted: &mut Vec<SchemaProperty>,
) -> Result<SchemaProperty> {
    let target = property.common.reference.clone();
    let extra = property.as_object_mut().and_then(|object| object.properties.take());
    match (target, extra) {
        (Some(target), Some(properties)) => {
            let id = combine_name_prefix(&to_upper_camel_case(key), Some(&target));
            let object = SchemaProperty::new(PropertyKind::Object(ObjectProperty {
                additional_properties: Some(AdditionalProperties::Schema(Box::new(SchemaProperty::reference(target)))),
                properties: Some(properties),
                ..ObjectProperty::default()
            }));
            Ok(convert_to_ref(object, id, hoisted))
        }
        (_, extra) => {
            if let Some(object) = property.as_object_mut() {
                object.properties = extra;
            }
            convert_to_ref_if_object(property, key, Some("Property"), hoisted)
        }
    }
}

/// Members of a named type. `prefix` is the path of names leading here; the type
/// itself (`is_root`) is never hoisted.
fn extract_member(
    mut node: SchemaProperty,
    prefix: &str,
    is_root: bool,
    hoisted: &mut Vec<SchemaProperty>,
) -> Result<SchemaProperty> {
    match &mut node.kind {
        PropertyKind::Object(object) => {
            extract_object_members(object, prefix, hoisted)?;
            if is_root || object.is_instance_of.is_some() {
                return Ok(node);
            }

            let no_properties = !object.has_properties();
            let additional = object.additional_schema();
            let array_map = additional.is_some_and(|schema| match &schema.kind {
                PropertyKind::Array(array) => array.items.as_ref().is_some_and(|items| items.kind.tag().is_some()),
                _ => false,
            });
            let object_map = additional.is_some_and(|schema| matches!(schema.kind, PropertyKind::Object(_)));

            if no_properties && array_map || object.pattern_properties.is_some() {
                Ok(node)
            } else if no_properties && object_map {
                let id = format!("{}Type", required_prefix(Some(prefix))?);
                let value = match object.additional_properties.take() {
                    Some(AdditionalProperties::Schema(value)) => *value,
                    _ => return Err(SchemaError::Invariant(format!("{id}: map value vanished"))),
                };
                Ok(convert_to_nested_ref(node, value, id, hoisted))
            } else {
                let id = format!("{}Type", required_prefix(Some(prefix))?);
                Ok(convert_to_ref(node, id, hoisted))
            }
        }
        PropertyKind::String(string) if string.enumeration.is_some() => {
            if is_root {
                Ok(node)
            } else {
                convert_to_ref_if_object(node, "", Some(prefix), hoisted)
            }
        }
        PropertyKind::Array(array) => {
            if let Some(items) = array.items.take() {
                array.items = Some(Box::new(convert_to_ref_if_object(*items, "item", Some(prefix), hoisted)?));
            }
            Ok(node)
        }
        PropertyKind::Choices(choices) => {
            if let Some(arms) = choices.choices.take() {
                let single = arms.len() == 1;
                let mut converted = Vec::with_capacity(arms.len());
                for (i, arm) in arms.into_iter().enumerate() {
                    let arm_prefix = if single { prefix.to_string() } else { format!("{prefix}C{}", i + 1) };
                    converted.push(extract_member(arm, &arm_prefix, false, hoisted)?);
                }
                choices.choices = Some(converted);
            }
            Ok(node)
        }
        PropertyKind::Function(function) => {
            for list in [&mut function.parameters, &mut function.extra_parameters] {
                if let Some(parameters) = list.take() {
                    let mut converted = Vec::with_capacity(parameters.len());
                    for parameter in parameters {
                        let name = combine_name_prefix(prefix, parameter.common.name.as_deref());
                        converted.push(extract_member(parameter, &name, false, hoisted)?);
                    }
                    *list = Some(converted);
                }
            }
            if let Some(returns) = function.returns.take() {
                let name = combine_name_prefix(prefix, Some("Return"));
                function.returns = Some(Box::new(extract_member(*returns, &name, false, hoisted)?));
            }
            Ok(node)
        }
        _ => Ok(node),
    }
}

fn extract_object_members(object: &mut ObjectProperty, prefix: &str, hoisted: &mut Vec<SchemaProperty>) -> Result<()> {
    object.additional_properties = match object.additional_properties.take() {
        Some(AdditionalProperties::Schema(value))
            if matches!(value.kind, PropertyKind::Object(_)) && value.common.reference.is_none() =>
        {
            Some(AdditionalProperties::Schema(Box::new(extract_member(*value, prefix, true, hoisted)?)))
        }
        other => other,
    };

    if let Some(properties) = object.properties.take() {
        let mut converted = indexmap::IndexMap::with_capacity(properties.len());
        for (key, property) in properties {
            let name = combine_name_prefix(prefix, Some(&key));
            converted.insert(key, extract_member(property, &name, false, hoisted)?);
        }
        object.properties = Some(converted);
    }
    if let Some(patterns) = object.pattern_properties.take() {
        let mut converted = indexmap::IndexMap::with_capacity(patterns.len());
        let name = format!("{prefix}Pattern");
        for (key, property) in patterns {
            converted.insert(key, extract_member(property, &name, false, hoisted)?);
        }
        object.pattern_properties = Some(converted);
    }
    for list in [&mut object.events, &mut object.functions] {
        if let Some(members) = list.take() {
            let mut converted = Vec::with_capacity(members.len());
            for member in members {
                let name = combine_name_prefix(prefix, member.common.name.as_deref());
                converted.push(extract_member(member, &name, false, hoisted)?);
            }
            *list = Some(converted);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use serde_json::json;

    fn extract(entry: serde_json::Value) -> serde_json::Value {
        json(&run_single(ExtractInlineContent, entry).unwrap())
    }

    #[test]
    fn test_parameter_object_is_hoisted() {
        let value = extract(json!({
            "namespace": "ns",
            "functions": [{
                "name": "bar",
                "type": "function",
                "parameters": [{ "name": "foo", "type": "object", "properties": { "x": { "type": "string" } } }]
            }]
        }));
        assert_eq!(
            value["functions"][0]["parameters"][0],
            json!({ "name": "foo", "type": "ref", "$ref": "BarFooType" })
        );
        assert_eq!(
            value["types"],
            json!([{ "id": "BarFooType", "type": "object", "properties": { "x": { "type": "string" } } }])
        );
    }

    #[test]
    fn test_member_fields_move_to_ref() {
        let value = extract(json!({
            "namespace": "ns",
            "functions": [{
                "name": "query",
                "type": "function",
                "parameters": [{
                    "name": "status",
                    "type": "string",
                    "enum": ["loading", "complete"],
                    "optional": true,
                    "description": "Load state"
                }]
            }]
        }));
        assert_eq!(
            value["functions"][0]["parameters"][0],
            json!({ "name": "status", "type": "ref", "$ref": "QueryStatusEnum", "optional": true, "description": "Load state" })
        );
        assert_eq!(
            value["types"][0],
            json!({ "id": "QueryStatusEnum", "type": "string", "enum": ["loading", "complete"], "description": "Load state" })
        );
    }

    #[test]
    fn test_returns_and_callback_parameters() {
        let value = extract(json!({
            "namespace": "ns",
            "functions": [{
                "name": "get",
                "type": "function",
                "parameters": [{
                    "name": "callback",
                    "type": "function",
                    "parameters": [{ "name": "info", "type": "object", "properties": {} }]
                }],
                "returns": { "type": "object", "properties": { "a": { "type": "integer" } } }
            }]
        }));
        let get = &value["functions"][0];
        assert_eq!(get["parameters"][0]["parameters"][0]["$ref"], "GetCallbackInfoType");
        assert_eq!(get["returns"]["$ref"], "GetReturnType");
    }

    #[test]
    fn test_type_members_are_hoisted() {
        let value = extract(json!({
            "namespace": "ns",
            "types": [{
                "id": "Tab",
                "type": "object",
                "properties": {
                    "mutedInfo": { "type": "object", "properties": { "muted": { "type": "boolean" } } },
                    "status": { "type": "string", "enum": ["loading"] },
                    "ids": { "type": "array", "items": { "type": "string", "enum": ["a"] } },
                    "headers": { "type": "object", "additionalProperties": { "$ref": "Header" } },
                    "patterns": { "type": "object", "patternProperties": { "^x": { "type": "string" } } }
                }
            }]
        }));
        let properties = &value["types"][0]["properties"];
        assert_eq!(properties["mutedInfo"]["$ref"], "TabMutedInfoType");
        assert_eq!(properties["status"]["$ref"], "TabStatusEnum");
        assert_eq!(properties["ids"]["items"]["$ref"], "TabIdsItemEnum");
        assert_eq!(properties["headers"]["$ref"], "TabHeadersType");
        assert_eq!(properties["patterns"]["type"], "object");

        let ids: Vec<_> = value["types"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap())
            .collect();
        assert_eq!(
            ids,
            vec!["Tab", "TabMutedInfoType", "TabStatusEnum", "TabIdsItemEnum", "TabHeadersType"]
        );
    }

    #[test]
    fn test_multi_arm_choices_are_numbered() {
        let value = extract(json!({
            "namespace": "ns",
            "functions": [{
                "name": "set",
                "type": "function",
                "parameters": [{
                    "name": "value",
                    "choices": [
                        { "type": "string", "enum": ["a"] },
                        { "type": "object", "properties": {} }
                    ]
                }]
            }]
        }));
        let choices = &value["functions"][0]["parameters"][0]["choices"];
        assert_eq!(choices[0]["$ref"], "SetValueC1Enum");
        assert_eq!(choices[1]["$ref"], "SetValueC2Type");
    }

    #[test]
    fn test_nested_map_value_is_hoisted() {
        let value = extract(json!({
            "namespace": "ns",
            "types": [{
                "id": "Store",
                "type": "object",
                "properties": {
                    "entries": {
                        "type": "object",
                        "additionalProperties": { "type": "object", "properties": { "size": { "type": "integer" } } }
                    }
                }
            }]
        }));
        assert_eq!(
            value["types"][0]["properties"]["entries"],
            json!({ "type": "object", "additionalProperties": { "type": "ref", "$ref": "StoreEntriesType" } })
        );
        assert_eq!(value["types"][1]["id"], "StoreEntriesType");
        assert_eq!(value["types"][1]["properties"]["size"]["type"], "integer");
    }

    #[test]
    fn test_namespace_property_with_ref_and_properties() {
        let value = extract(json!({
            "namespace": "ns",
            "properties": {
                "local": { "$ref": "StorageArea", "properties": { "QUOTA": { "value": 5 } } },
                "mode": { "type": "string", "enum": ["a", "b"] }
            }
        }));
        assert_eq!(value["properties"]["local"], json!({ "type": "ref", "$ref": "LocalStorageArea" }));
        assert_eq!(value["properties"]["mode"]["$ref"], "PropertyModeEnum");
        assert_eq!(value["types"][0]["id"], "LocalStorageArea");
        assert_eq!(value["types"][0]["additionalProperties"]["$ref"], "StorageArea");
        assert_eq!(value["types"][0]["properties"]["QUOTA"]["value"], 5);
    }

    #[test]
    fn test_missing_parameter_name() {
        let err = run_single(
            ExtractInlineContent,
            json!({
                "namespace": "ns",
                "functions": [{ "name": "f", "type": "function", "parameters": [{ "type": "string" }] }]
            }),
        )
        .unwrap_err();
        assert!(matches!(err.root_cause(), SchemaError::MissingName(_)));
    }
}
