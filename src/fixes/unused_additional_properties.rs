//! Drops `additionalProperties` that only point at catch-all marker types, and
//! removes nodes flagged unsupported or deprecated

use crate::error::Result;
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::schema::SchemaProperty;
use crate::visitor::{NodeKind, SchemaVisitor, Visit};

use super::Fix;

pub struct RemoveUnusedAdditionalProperties {
    ignored: Vec<String>,
}

impl RemoveUnusedAdditionalProperties {
    pub fn new(ignored: Vec<String>) -> Self {
        Self { ignored }
    }
}

impl Fix for RemoveUnusedAdditionalProperties {
    fn name(&self) -> &'static str {
        "remove unused additional properties"
    }

    fn visitor<'a>(
        &'a self,
        _namespace: &ImportedNamespace,
        _namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        Ok(Some(Box::new(AdditionalPropertiesFilter(&self.ignored))))
    }
}

struct AdditionalPropertiesFilter<'a>(&'a [String]);

impl SchemaVisitor for AdditionalPropertiesFilter<'_> {
    fn visit_node(&mut self, _kind: NodeKind, mut node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        if node.is_flagged() {
            return Ok(Visit::Remove);
        }
        if let Some(object) = node.as_object_mut() {
            let ignored = object
                .additional_schema()
                .and_then(|schema| schema.common.reference.as_ref())
                .is_some_and(|target| self.0.contains(target));
            if ignored {
                object.additional_properties = None;
            }
        }
        Ok(Visit::Keep(node))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_marker_additional_properties_dropped() {
        let entry = run_single(
            RemoveUnusedAdditionalProperties::new(vec!["UnrecognizedProperty".to_string()]),
            json!({
                "namespace": "test",
                "types": [
                    {
                        "id": "Manifest",
                        "type": "object",
                        "properties": { "name": { "type": "string" } },
                        "additionalProperties": { "$ref": "UnrecognizedProperty" }
                    },
                    {
                        "id": "Headers",
                        "type": "object",
                        "additionalProperties": { "type": "string" }
                    },
                    { "id": "Old", "type": "string", "deprecated": true }
                ]
            }),
        )
        .unwrap();
        let value = json(&entry);
        assert!(value["types"][0].get("additionalProperties").is_none());
        assert_eq!(value["types"][1]["additionalProperties"]["type"], "string");
        assert_eq!(value["types"].as_array().unwrap().len(), 2);
    }
}
