//! Rewrites `$ref` targets that have a simpler equivalent

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::schema::SchemaProperty;
use crate::visitor::{NodeKind, SchemaVisitor, Visit};

use super::Fix;

pub struct CleanupRefs {
    config: PipelineConfig,
}

impl CleanupRefs {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl Fix for CleanupRefs {
    fn name(&self) -> &'static str {
        "clean up $ref values"
    }

    fn visitor<'a>(
        &'a self,
        _namespace: &ImportedNamespace,
        _namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        Ok(Some(Box::new(RefRewriter(&self.config))))
    }
}

struct RefRewriter<'a>(&'a PipelineConfig);

impl SchemaVisitor for RefRewriter<'_> {
    fn visit_node(&mut self, _kind: NodeKind, mut node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        if let Some(target) = node.common.reference.as_mut() {
            if let Some(mapped) = self.0.mapped_ref(target) {
                *target = mapped.to_string();
            }
        }
        Ok(Visit::Keep(node))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::config::RefMapping;
    use serde_json::json;

    #[test]
    fn test_refs_are_mapped() {
        let entry = run_single(
            CleanupRefs::new(PipelineConfig::default()),
            json!({
                "namespace": "test",
                "types": [{
                    "id": "Manifest",
                    "type": "object",
                    "properties": {
                        "persistent": { "$ref": "PersistentBackgroundProperty" },
                        "other": { "$ref": "UnrecognizedProperty" },
                        "icon": { "$ref": "IconPath" }
                    }
                }]
            }),
        )
        .unwrap();
        let properties = &json(&entry)["types"][0]["properties"];
        assert_eq!(properties["persistent"]["$ref"], "boolean");
        assert_eq!(properties["other"]["$ref"], "any");
        assert_eq!(properties["icon"]["$ref"], "IconPath");
    }

    #[test]
    fn test_configured_mapping() {
        let config = PipelineConfig {
            ref_mappings: vec![RefMapping::new("ImageDataOrExtensionURL", "string")],
            ..PipelineConfig::default()
        };
        let entry = run_single(
            CleanupRefs::new(config),
            json!({
                "namespace": "test",
                "functions": [{
                    "name": "setIcon",
                    "type": "function",
                    "parameters": [{ "name": "icon", "$ref": "ImageDataOrExtensionURL" }],
                    "returns": { "$ref": "UnrecognizedProperty" }
                }]
            }),
        )
        .unwrap();
        let function = &json(&entry)["functions"][0];
        assert_eq!(function["parameters"][0]["$ref"], "string");
        assert_eq!(function["returns"]["$ref"], "UnrecognizedProperty");
    }
}
