//! Schema traversal
//!
//! A pass implements [`SchemaVisitor`], overriding only the node kinds it cares
//! about. The walker visits a parent before its children, so a visitor can rewrite
//! or drop a subtree before the walker descends into it. Nodes a visitor removes
//! are cut out of their list or map and never descended into.
//!
//! Traversal order:
//! - namespace: `types` (Type), `functions` (Function), `events` (Event), `properties`
//! - object: `properties`, `additionalProperties`, `patternProperties`, `functions`
//!   (Function), `events` (Event)
//! - array: `items`
//! - function: `parameters` and `extraParameters` (Parameter), `returns` (Returns),
//!   `filters`
//! - choices: `choices`
//!
//! Children reached through properties, maps, items and choices are dispatched as
//! Function when they are functions and as Property otherwise.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{Result, SchemaError};
use crate::namespace::ImportedNamespace;
use crate::schema::{AdditionalProperties, PropertyKind, SchemaEntry, SchemaProperty};

/// The kind of position a node is visited in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Namespace,
    Type,
    Function,
    Event,
    Parameter,
    Returns,
    Property,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Namespace => "Namespace",
            NodeKind::Type => "Type",
            NodeKind::Function => "Function",
            NodeKind::Event => "Event",
            NodeKind::Parameter => "Parameter",
            NodeKind::Returns => "Returns",
            NodeKind::Property => "Property",
        };
        f.write_str(name)
    }
}

/// Outcome of visiting a node
#[derive(Debug, Clone, PartialEq)]
pub enum Visit<T> {
    Keep(T),
    Remove,
}

/// Callbacks for one pass over one namespace
pub trait SchemaVisitor {
    fn visit_namespace(&mut self, entry: SchemaEntry) -> Result<Visit<SchemaEntry>> {
        Ok(Visit::Keep(entry))
    }

    /// Fallback for every node kind that is not overridden
    fn visit_node(&mut self, _kind: NodeKind, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        Ok(Visit::Keep(node))
    }

    fn visit_type(&mut self, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        self.visit_node(NodeKind::Type, node)
    }

    fn visit_function(&mut self, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        self.visit_node(NodeKind::Function, node)
    }

    fn visit_event(&mut self, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        self.visit_node(NodeKind::Event, node)
    }

    fn visit_parameter(&mut self, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        self.visit_node(NodeKind::Parameter, node)
    }

    fn visit_returns(&mut self, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        self.visit_node(NodeKind::Returns, node)
    }

    fn visit_property(&mut self, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        self.visit_node(NodeKind::Property, node)
    }

    /// Runs once the whole entry has been walked
    fn finish(&mut self, _entry: &mut SchemaEntry) -> Result<()> {
        Ok(())
    }
}

/// Walk one namespace with `visitor`. Returns `false` when the namespace visitor
/// removed the namespace.
pub fn walk_namespace(
    namespace: &mut ImportedNamespace,
    visitor: &mut dyn SchemaVisitor,
    pass: &str,
) -> Result<bool> {
    let mut walker = Walker {
        file: &namespace.file,
        pass,
        visitor,
    };
    let entry = std::mem::take(&mut namespace.entry);
    match walker.walk_entry(entry)? {
        Some(entry) => {
            namespace.entry = entry;
            Ok(true)
        }
        None => Ok(false),
    }
}

struct Walker<'w> {
    file: &'w str,
    pass: &'w str,
    visitor: &'w mut dyn SchemaVisitor,
}

impl<'w> Walker<'w> {
    fn context(&self, kind: NodeKind) -> impl Fn(SchemaError) -> SchemaError + use<'_, 'w> {
        move |e| SchemaError::in_pass(self.file, self.pass, kind, e)
    }

    fn walk_entry(&mut self, entry: SchemaEntry) -> Result<Option<SchemaEntry>> {
        let visited = self
            .visitor
            .visit_namespace(entry)
            .map_err(self.context(NodeKind::Namespace))?;
        let mut entry = match visited {
            Visit::Keep(entry) => entry,
            Visit::Remove => return Ok(None),
        };

        if let Some(types) = entry.types.take() {
            entry.types = Some(self.walk_list(types, Some(NodeKind::Type))?);
        }
        if let Some(functions) = entry.functions.take() {
            entry.functions = Some(self.walk_list(functions, Some(NodeKind::Function))?);
        }
        if let Some(events) = entry.events.take() {
            entry.events = Some(self.walk_list(events, Some(NodeKind::Event))?);
        }
        if let Some(properties) = entry.properties.take() {
            entry.properties = Some(self.walk_map(properties)?);
        }

        self.visitor
            .finish(&mut entry)
            .map_err(self.context(NodeKind::Namespace))?;
        Ok(Some(entry))
    }

    fn dispatch(&mut self, kind: NodeKind, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        let result = match kind {
            NodeKind::Type => self.visitor.visit_type(node),
            NodeKind::Function => self.visitor.visit_function(node),
            NodeKind::Event => self.visitor.visit_event(node),
            NodeKind::Parameter => self.visitor.visit_parameter(node),
            NodeKind::Returns => self.visitor.visit_returns(node),
            NodeKind::Property => self.visitor.visit_property(node),
            NodeKind::Namespace => Ok(Visit::Keep(node)),
        };
        result.map_err(self.context(kind))
    }

    /// Visit a node, then its children. `None` when the visitor removed it.
    fn walk_node(&mut self, kind: Option<NodeKind>, node: SchemaProperty) -> Result<Option<SchemaProperty>> {
        let kind = kind.unwrap_or_else(|| generic_kind(&node));
        match self.dispatch(kind, node)? {
            Visit::Keep(mut node) => {
                self.walk_children(&mut node)?;
                Ok(Some(node))
            }
            Visit::Remove => Ok(None),
        }
    }

    fn walk_list(&mut self, list: Vec<SchemaProperty>, kind: Option<NodeKind>) -> Result<Vec<SchemaProperty>> {
        let mut kept = Vec::with_capacity(list.len());
        for node in list {
            if let Some(node) = self.walk_node(kind, node)? {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    fn walk_map(&mut self, map: IndexMap<String, SchemaProperty>) -> Result<IndexMap<String, SchemaProperty>> {
        let mut kept = IndexMap::with_capacity(map.len());
        for (key, node) in map {
            if let Some(node) = self.walk_node(None, node)? {
                kept.insert(key, node);
            }
        }
        Ok(kept)
    }

    fn walk_boxed(&mut self, node: Box<SchemaProperty>, kind: Option<NodeKind>) -> Result<Option<Box<SchemaProperty>>> {
        Ok(self.walk_node(kind, *node)?.map(Box::new))
    }

    fn walk_children(&mut self, node: &mut SchemaProperty) -> Result<()> {
        match &mut node.kind {
            PropertyKind::Choices(choices) => {
                if let Some(list) = choices.choices.take() {
                    choices.choices = Some(self.walk_list(list, None)?);
                }
            }
            PropertyKind::Object(object) | PropertyKind::Binary(object) => {
                if let Some(properties) = object.properties.take() {
                    object.properties = Some(self.walk_map(properties)?);
                }
                match object.additional_properties.take() {
                    Some(AdditionalProperties::Schema(schema)) => {
                        object.additional_properties =
                            self.walk_boxed(schema, None)?.map(AdditionalProperties::Schema);
                    }
                    other => object.additional_properties = other,
                }
                if let Some(patterns) = object.pattern_properties.take() {
                    object.pattern_properties = Some(self.walk_map(patterns)?);
                }
                if let Some(functions) = object.functions.take() {
                    object.functions = Some(self.walk_list(functions, Some(NodeKind::Function))?);
                }
                if let Some(events) = object.events.take() {
                    object.events = Some(self.walk_list(events, Some(NodeKind::Event))?);
                }
            }
            PropertyKind::Array(array) => {
                if let Some(items) = array.items.take() {
                    array.items = self.walk_boxed(items, None)?;
                }
            }
            PropertyKind::Function(function) => {
                if let Some(parameters) = function.parameters.take() {
                    function.parameters = Some(self.walk_list(parameters, Some(NodeKind::Parameter))?);
                }
                if let Some(extra) = function.extra_parameters.take() {
                    function.extra_parameters = Some(self.walk_list(extra, Some(NodeKind::Parameter))?);
                }
                if let Some(returns) = function.returns.take() {
                    function.returns = self.walk_boxed(returns, Some(NodeKind::Returns))?;
                }
                if let Some(filters) = function.filters.take() {
                    function.filters = Some(self.walk_list(filters, None)?);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn generic_kind(node: &SchemaProperty) -> NodeKind {
    if node.is_function() {
        NodeKind::Function
    } else {
        NodeKind::Property
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::ExtensionRules;
    use serde_json::json;

    /// Records every visit as `Kind:name-or-id`
    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
    }

    impl SchemaVisitor for Recorder {
        fn visit_node(&mut self, kind: NodeKind, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
            let label = node.common.id.clone().or(node.common.name.clone()).unwrap_or_default();
            self.seen.push(format!("{kind}:{label}"));
            Ok(Visit::Keep(node))
        }
    }

    struct RemoveNamed(&'static str);

    impl SchemaVisitor for RemoveNamed {
        fn visit_node(&mut self, _kind: NodeKind, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
            if node.common.name.as_deref() == Some(self.0) || node.common.id.as_deref() == Some(self.0) {
                Ok(Visit::Remove)
            } else {
                Ok(Visit::Keep(node))
            }
        }
    }

    struct FailOnReturns;

    impl SchemaVisitor for FailOnReturns {
        fn visit_returns(&mut self, _node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
            Err(SchemaError::Invariant("boom".to_string()))
        }
    }

    fn namespace() -> ImportedNamespace {
        let entry = SchemaEntry::from_value(json!({
            "namespace": "tabs",
            "types": [
                {
                    "id": "Tab",
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "onUpdated": { "type": "function", "parameters": [] }
                    },
                    "events": [{ "name": "changed", "type": "function" }]
                }
            ],
            "functions": [
                {
                    "name": "get",
                    "type": "function",
                    "parameters": [{ "name": "tabId", "type": "integer" }],
                    "returns": { "type": "array", "items": { "name": "item", "$ref": "Tab" } }
                }
            ],
            "events": [
                { "name": "onCreated", "type": "function", "parameters": [{ "name": "tab", "$ref": "Tab" }] }
            ],
            "properties": { "TAB_ID_NONE": { "value": -1 } }
        }))
        .unwrap();
        ImportedNamespace::new("tabs.json", "", entry, &ExtensionRules::default()).unwrap()
    }

    #[test]
    fn test_visit_order() {
        let mut ns = namespace();
        let mut recorder = Recorder::default();
        assert!(walk_namespace(&mut ns, &mut recorder, "record").unwrap());
        assert_eq!(
            recorder.seen,
            vec![
                "Type:Tab",
                "Property:",
                "Function:",
                "Event:changed",
                "Function:get",
                "Parameter:tabId",
                "Returns:",
                "Property:item",
                "Event:onCreated",
                "Parameter:tab",
                "Property:",
            ]
        );
    }

    #[test]
    fn test_removed_nodes_are_excised() {
        let mut ns = namespace();
        walk_namespace(&mut ns, &mut RemoveNamed("tabId"), "remove").unwrap();
        let get = &ns.entry.functions.as_ref().unwrap()[0];
        assert!(get.as_function().unwrap().parameters.as_ref().unwrap().is_empty());

        walk_namespace(&mut ns, &mut RemoveNamed("Tab"), "remove").unwrap();
        assert!(ns.entry.types.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_errors_carry_context() {
        let mut ns = namespace();
        let err = walk_namespace(&mut ns, &mut FailOnReturns, "failing").unwrap_err();
        assert_eq!(
            err.to_string(),
            "error processing 'tabs.json' in fix 'failing' (Returns): Invariant violated: boom"
        );
        assert!(matches!(err.root_cause(), SchemaError::Invariant(_)));
    }

    #[test]
    fn test_namespace_removal() {
        struct DropAll;
        impl SchemaVisitor for DropAll {
            fn visit_namespace(&mut self, _entry: SchemaEntry) -> Result<Visit<SchemaEntry>> {
                Ok(Visit::Remove)
            }
        }
        let mut ns = namespace();
        assert!(!walk_namespace(&mut ns, &mut DropAll, "drop").unwrap());
    }
}
