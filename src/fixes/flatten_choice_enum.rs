//! Folds unions over extracted enum types back into plain string enums
//!
//! Inline extraction turns every enum arm of a union into a named `...Enum`
//! type. A union with a single such arm becomes the string enum itself; in a
//! larger union the enum arms are merged into one string enum arm. Enum types
//! that end up unreferenced are marked deprecated so the next purge drops them.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, SchemaError};
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::references::collect_refs;
use crate::schema::{Deprecated, EnumValue, PropertyKind, SchemaEntry, SchemaProperty, StringProperty};
use crate::visitor::{NodeKind, SchemaVisitor, Visit};

use super::Fix;

pub struct FlattenChoiceEnum;

impl Fix for FlattenChoiceEnum {
    fn name(&self) -> &'static str {
        "flatten choice enums"
    }

    fn visitor<'a>(
        &'a self,
        namespace: &ImportedNamespace,
        _namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        let types = namespace
            .entry
            .types
            .iter()
            .flatten()
            .filter_map(|t| Some((t.common.id.clone()?, EnumTarget::of(t))))
            .collect();
        Ok(Some(Box::new(Flattener {
            types,
            flattened: HashSet::new(),
        })))
    }
}

/// What a `...Enum` ref points at
#[derive(Debug, Clone)]
enum EnumTarget {
    Values(Vec<EnumValue>),
    PlainString,
    Other,
}

impl EnumTarget {
    fn of(node: &SchemaProperty) -> Self {
        match &node.kind {
            PropertyKind::String(string) => match &string.enumeration {
                Some(values) => EnumTarget::Values(values.clone()),
                None => EnumTarget::PlainString,
            },
            _ => EnumTarget::Other,
        }
    }
}

struct Flattener {
    types: HashMap<String, EnumTarget>,
    flattened: HashSet<String>,
}

impl Flattener {
    /// Enum values behind `arm`, if it is a local `...Enum` ref to a string enum
    fn resolve(&self, arm: &SchemaProperty) -> Result<Option<(String, Vec<EnumValue>)>> {
        let Some(target) = arm.common.reference.as_deref() else {
            return Ok(None);
        };
        if !target.ends_with("Enum") || target.contains('.') {
            return Ok(None);
        }
        match self.types.get(target) {
            None => Err(SchemaError::MissingType(target.to_string())),
            Some(EnumTarget::Other) => Err(SchemaError::Invariant(format!(
                "cannot flatten {target}: both must be string"
            ))),
            Some(EnumTarget::PlainString) => Ok(None),
            Some(EnumTarget::Values(values)) => Ok(Some((target.to_string(), values.clone()))),
        }
    }
}

impl SchemaVisitor for Flattener {
    fn visit_node(&mut self, _kind: NodeKind, mut node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        let PropertyKind::Choices(choices) = &mut node.kind else {
            return Ok(Visit::Keep(node));
        };
        let Some(arms) = choices.choices.as_mut() else {
            return Ok(Visit::Keep(node));
        };

        let mut matched = Vec::new();
        for (index, arm) in arms.iter().enumerate() {
            if let Some((target, values)) = self.resolve(arm)? {
                matched.push((index, target, values));
            }
        }
        if matched.is_empty() {
            return Ok(Visit::Keep(node));
        }

        let mut merged = Vec::new();
        for (_, target, values) in &matched {
            tracing::debug!(target = %target, "flattening enum choice");
            self.flattened.insert(target.clone());
            merged.extend(values.iter().cloned());
        }

        if arms.len() == 1 {
            node.kind = PropertyKind::String(StringProperty::enumeration(merged));
            return Ok(Visit::Keep(node));
        }

        let first = matched[0].0;
        for (index, _, _) in matched.iter().skip(1).rev() {
            arms.remove(*index);
        }
        arms[first] = SchemaProperty::new(PropertyKind::String(StringProperty::enumeration(merged)));
        Ok(Visit::Keep(node))
    }

    fn finish(&mut self, entry: &mut SchemaEntry) -> Result<()> {
        if self.flattened.is_empty() {
            return Ok(());
        }
        let remaining = collect_refs(entry);
        for node in entry.types_mut() {
            let Some(id) = node.common.id.as_deref() else {
                continue;
            };
            if self.flattened.contains(id) && !remaining.contains(id) {
                node.common.deprecated = Some(Deprecated::Flag(true));
            }
        }
        Ok(())
    }
}
