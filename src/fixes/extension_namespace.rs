//! Merges extension fragments into their primary namespace
//!
//! An extension contributes new types, functions and events, and may widen
//! existing types through `$extend`: a choices type gains union arms (or, when
//! only string enums are added, enum values on the existing enum arm) and an
//! object type gains properties. The fragment is removed afterwards.
//!
//! This is the only fix that writes to a namespace other than the one it visits.

use crate::error::{Result, SchemaError};
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::schema::{ChoicesProperty, ObjectProperty, PropertyKind, SchemaEntry, SchemaProperty};
use crate::visitor::{SchemaVisitor, Visit};

use super::Fix;

pub struct ApplyExtensionNamespace;

impl Fix for ApplyExtensionNamespace {
    fn name(&self) -> &'static str {
        "apply namespace extensions"
    }

    fn visitor<'a>(
        &'a self,
        namespace: &ImportedNamespace,
        namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        if !namespace.is_extension {
            return Ok(None);
        }
        let target = namespaces
            .primary_mut(namespace.name())
            .ok_or_else(|| SchemaError::MissingNamespace(namespace.name().to_string()))?;
        target.append_comments(&namespace.comments);
        tracing::debug!(namespace = %namespace.name(), from = %namespace.file, into = %target.file, "merging extension");
        Ok(Some(Box::new(MergeInto {
            target: &mut target.entry,
        })))
    }
}

struct MergeInto<'a> {
    target: &'a mut SchemaEntry,
}

impl SchemaVisitor for MergeInto<'_> {
    fn visit_namespace(&mut self, entry: SchemaEntry) -> Result<Visit<SchemaEntry>> {
        merge_entry(self.target, entry)?;
        Ok(Visit::Remove)
    }
}

/// Merge the contents of `extension` into `target`
pub fn merge_entry(target: &mut SchemaEntry, extension: SchemaEntry) -> Result<()> {
    for node in extension.types.unwrap_or_default() {
        match node.common.extend.clone() {
            Some(id) => extend_type(target, &id, node)?,
            None => target.types_mut().push(node),
        }
    }
    if let Some(functions) = extension.functions {
        target.functions.get_or_insert_with(Vec::new).extend(functions);
    }
    if let Some(events) = extension.events {
        target.events.get_or_insert_with(Vec::new).extend(events);
    }
    Ok(())
}

fn extend_type(target: &mut SchemaEntry, id: &str, node: SchemaProperty) -> Result<()> {
    check_shape(id, &node)?;
    let extended = target
        .types_mut()
        .iter_mut()
        .find(|t| t.common.id.as_deref() == Some(id))
        .ok_or_else(|| SchemaError::MissingType(id.to_string()))?;

    match (node.kind, &mut extended.kind) {
        (PropertyKind::Choices(new), PropertyKind::Choices(existing)) => merge_choices(id, existing, new),
        (PropertyKind::Object(new), PropertyKind::Object(existing)) => {
            merge_properties(existing, new);
            Ok(())
        }
        _ => Err(SchemaError::Invariant(format!("Bad $extend of {id}"))),
    }
}

/// An extending type may only carry its tag, `$extend` and the members it adds
fn check_shape(id: &str, node: &SchemaProperty) -> Result<()> {
    let allowed: &[&str] = match node.kind {
        PropertyKind::Choices(_) => &["type", "$extend", "choices"],
        PropertyKind::Object(_) => &["type", "$extend", "properties"],
        _ => return Err(SchemaError::Invariant(format!("Unknown extension type {id}"))),
    };
    let value = node.to_value()?;
    let keys = value.as_object().into_iter().flat_map(|map| map.keys());
    for key in keys {
        if !allowed.contains(&key.as_str()) {
            return Err(SchemaError::UnknownKey {
                key: key.clone(),
                kind: format!("$extend {id}"),
            });
        }
    }
    Ok(())
}

fn merge_choices(id: &str, existing: &mut ChoicesProperty, new: ChoicesProperty) -> Result<()> {
    let new = new.choices.unwrap_or_default();
    let arms = existing.choices.get_or_insert_with(Vec::new);

    let only_enums = new.iter().all(|c| c.enum_values().is_some());
    let mut enum_arms = arms.iter_mut().filter_map(|arm| match &mut arm.kind {
        PropertyKind::String(string) => string.enumeration.as_mut(),
        _ => None,
    });

    if only_enums {
        if let Some(values) = enum_arms.next() {
            if enum_arms.next().is_some() {
                return Err(SchemaError::Invariant(format!(
                    "cannot fold enum values into {id}: it has more than one enum choice"
                )));
            }
            for choice in &new {
                values.extend(choice.enum_values().unwrap_or_default().iter().cloned());
            }
            return Ok(());
        }
    }

    arms.extend(new);
    Ok(())
}

fn merge_properties(existing: &mut ObjectProperty, new: ObjectProperty) {
    let properties = existing.properties.get_or_insert_with(Default::default);
    for (key, property) in new.properties.unwrap_or_default() {
        properties.insert(key, property);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use serde_json::json;

    fn manifest() -> ImportedNamespace {
        namespace(
            "manifest.json",
            json!({
                "namespace": "manifest",
                "types": [
                    {
                        "id": "Permission",
                        "choices": [
                            { "type": "string", "enum": ["tabs"] },
                            { "type": "string", "pattern": "^moz-extension:" }
                        ]
                    },
                    {
                        "id": "WebExtensionManifest",
                        "type": "object",
                        "properties": { "name": { "type": "string" } }
                    }
                ],
                "functions": [{ "name": "a", "type": "function" }]
            }),
        )
    }

    fn run_merge(extension: serde_json::Value) -> Result<Vec<ImportedNamespace>> {
        let mut namespaces = arena(vec![manifest(), namespace("ext.json", extension)]);
        run(ApplyExtensionNamespace, &mut namespaces)?;
        Ok(namespaces.into_vec())
    }

    #[test]
    fn test_merge_is_complete() {
        let result = run_merge(json!({
            "namespace": "manifest",
            "types": [
                { "id": "IconPath", "type": "string" },
                { "$extend": "WebExtensionManifest", "properties": { "name": { "type": "integer" }, "icons": { "$ref": "IconPath" } } }
            ],
            "functions": [{ "name": "b", "type": "function" }],
            "events": [{ "name": "onC", "type": "function" }]
        }))
        .unwrap();

        assert_eq!(result.len(), 1);
        assert!(!result[0].is_extension);
        let value = json(&result[0].entry);
        assert_eq!(value["types"][2]["id"], "IconPath");
        let properties = &value["types"][1]["properties"];
        assert_eq!(properties["name"]["type"], "integer");
        assert_eq!(properties["icons"]["$ref"], "IconPath");
        assert_eq!(value["functions"].as_array().unwrap().len(), 2);
        assert_eq!(value["events"][0]["name"], "onC");
    }

    #[test]
    fn test_enum_choices_fold_into_existing_enum() {
        let result = run_merge(json!({
            "namespace": "manifest",
            "types": [{ "$extend": "Permission", "choices": [{ "type": "string", "enum": ["cookies", "downloads"] }] }]
        }))
        .unwrap();
        let permission = result[0].entry.find_type("Permission").unwrap();
        let value = permission.to_value().unwrap();
        assert_eq!(value["choices"].as_array().unwrap().len(), 2);
        assert_eq!(value["choices"][0]["enum"], json!(["tabs", "cookies", "downloads"]));
    }

    #[test]
    fn test_other_choices_are_appended() {
        let result = run_merge(json!({
            "namespace": "manifest",
            "types": [{ "$extend": "Permission", "choices": [{ "type": "integer" }] }]
        }))
        .unwrap();
        let value = result[0].entry.find_type("Permission").unwrap().to_value().unwrap();
        assert_eq!(value["choices"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_missing_extend_target() {
        let err = run_merge(json!({
            "namespace": "manifest",
            "types": [{ "$extend": "Nope", "properties": {} }]
        }))
        .unwrap_err();
        assert!(matches!(err.root_cause(), SchemaError::MissingType(_)));
    }

    #[test]
    fn test_extension_shape_is_checked() {
        let err = run_merge(json!({
            "namespace": "manifest",
            "types": [{ "$extend": "WebExtensionManifest", "description": "x", "properties": {} }]
        }))
        .unwrap_err();
        assert!(matches!(err.root_cause(), SchemaError::UnknownKey { .. }));
    }

    #[test]
    fn test_ambiguous_enum_fold_is_an_error() {
        let mut target = manifest().entry;
        let permission = target.types_mut().iter_mut().next().unwrap();
        if let PropertyKind::Choices(choices) = &mut permission.kind {
            choices.choices.as_mut().unwrap().push(node(json!({ "type": "string", "enum": ["other"] })));
        }
        let extension = crate::schema::SchemaEntry::from_value(json!({
            "namespace": "manifest",
            "types": [{ "$extend": "Permission", "choices": [{ "type": "string", "enum": ["x"] }] }]
        }))
        .unwrap();
        let err = merge_entry(&mut target, extension).unwrap_err();
        assert!(matches!(err, SchemaError::Invariant(_)));
    }

    #[test]
    fn test_comments_are_appended() {
        let mut primary = manifest();
        primary.comments = "License".to_string();
        let mut extension = namespace("menus_child.json", json!({ "namespace": "manifest" }));
        extension.comments = "Child".to_string();
        let mut namespaces = arena(vec![primary, extension]);
        run(ApplyExtensionNamespace, &mut namespaces).unwrap();
        assert_eq!(namespaces.primary("manifest").unwrap().comments, "License\n\nChild");
    }
}
