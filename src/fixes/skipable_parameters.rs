//! Marks parameters that may be left out of a call
//!
//! Every parameter in front of the first required non-function parameter is
//! skipable: a call may omit it and still pass the required one. Callbacks do not
//! count as required.

use crate::error::Result;
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::schema::SchemaProperty;
use crate::visitor::{SchemaVisitor, Visit};

use super::Fix;

pub struct DetectSkipableParameters;

impl Fix for DetectSkipableParameters {
    fn name(&self) -> &'static str {
        "detect skipable parameters"
    }

    fn visitor<'a>(
        &'a self,
        _namespace: &ImportedNamespace,
        _namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        Ok(Some(Box::new(SkipableParameters)))
    }
}

struct SkipableParameters;

impl SchemaVisitor for SkipableParameters {
    fn visit_function(&mut self, mut node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        if let Some(parameters) = node.as_function_mut().and_then(|f| f.parameters.as_mut()) {
            let required = parameters
                .iter()
                .position(|p| !p.common.optional.is_optional() && !p.is_function());
            if let Some(required) = required {
                for parameter in &mut parameters[..required] {
                    parameter.common.skipable_parameter = true;
                }
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

    fn skipable(entry: &crate::schema::SchemaEntry) -> Vec<bool> {
        entry.functions.as_ref().unwrap()[0]
            .as_function()
            .unwrap()
            .parameters
            .as_ref()
            .unwrap()
            .iter()
            .map(|p| p.common.skipable_parameter)
            .collect()
    }

    #[test]
    fn test_optional_before_required_are_skipable() {
        let entry = run_single(
            DetectSkipableParameters,
            json!({
                "namespace": "test",
                "functions": [{
                    "name": "f",
                    "type": "function",
                    "parameters": [
                        { "name": "a", "type": "string", "optional": true },
                        { "name": "b", "type": "integer", "optional": true },
                        { "name": "c", "type": "string" }
                    ]
                }]
            }),
        )
        .unwrap();
        assert_eq!(skipable(&entry), vec![true, true, false]);
    }

    #[test]
    fn test_trailing_optional_not_skipable() {
        let entry = run_single(
            DetectSkipableParameters,
            json!({
                "namespace": "test",
                "functions": [{
                    "name": "f",
                    "type": "function",
                    "parameters": [
                        { "name": "a", "type": "string" },
                        { "name": "b", "type": "string", "optional": true }
                    ]
                }]
            }),
        )
        .unwrap();
        assert_eq!(skipable(&entry), vec![false, false]);
    }

    #[test]
    fn test_callbacks_are_not_required() {
        let entry = run_single(
            DetectSkipableParameters,
            json!({
                "namespace": "test",
                "functions": [{
                    "name": "f",
                    "type": "function",
                    "parameters": [
                        { "name": "a", "type": "string", "optional": true },
                        { "name": "callback", "type": "function" }
                    ]
                }]
            }),
        )
        .unwrap();
        assert_eq!(skipable(&entry), vec![false, false]);
    }
}
