//! Final purge of unsupported and deprecated nodes

use crate::error::Result;
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::schema::SchemaProperty;
use crate::visitor::{NodeKind, SchemaVisitor, Visit};

use super::Fix;

pub struct RemoveUnsupported;

impl Fix for RemoveUnsupported {
    fn name(&self) -> &'static str {
        "remove unsupported and deprecated content"
    }

    fn visitor<'a>(
        &'a self,
        _namespace: &ImportedNamespace,
        _namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        Ok(Some(Box::new(FlaggedFilter)))
    }
}

struct FlaggedFilter;

impl SchemaVisitor for FlaggedFilter {
    fn visit_node(&mut self, _kind: NodeKind, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        if node.is_flagged() {
            Ok(Visit::Remove)
        } else {
            Ok(Visit::Keep(node))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flagged_nodes_removed_at_every_depth() {
        let entry = run_single(
            RemoveUnsupported,
            json!({
                "namespace": "test",
                "types": [{
                    "id": "Options",
                    "type": "object",
                    "properties": {
                        "keep": { "type": "string" },
                        "gone": { "type": "string", "unsupported": true },
                        "list": { "type": "array", "items": { "type": "object", "properties": {
                            "old": { "type": "integer", "deprecated": "Use new" },
                            "new": { "type": "integer" }
                        } } }
                    }
                }],
                "functions": [
                    { "name": "legacy", "type": "function", "deprecated": true },
                    {
                        "name": "current",
                        "type": "function",
                        "parameters": [{ "name": "x", "type": "string", "unsupported": "true" }],
                        "returns": { "type": "string", "deprecated": true }
                    }
                ],
                "events": [{ "name": "onOld", "type": "function", "unsupported": true }]
            }),
        )
        .unwrap();
        let value = json(&entry);
        let properties = &value["types"][0]["properties"];
        assert!(properties.get("gone").is_none());
        assert!(properties["list"]["items"]["properties"].get("old").is_none());
        assert!(properties["list"]["items"]["properties"].get("new").is_some());
        assert_eq!(value["functions"].as_array().unwrap().len(), 1);
        assert!(value["functions"][0]["parameters"].as_array().unwrap().is_empty());
        assert!(value["functions"][0].get("returns").is_none());
        assert!(value["events"].as_array().unwrap().is_empty());
    }
}
