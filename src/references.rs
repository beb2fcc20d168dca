//! Dangling `$ref` detection over the normalized forest

use std::collections::HashSet;

use crate::config::PipelineConfig;
use crate::error::{Result, SchemaError};
use crate::namespace::Namespaces;
use crate::schema::{SchemaEntry, SchemaProperty};
use crate::visitor::NodeKind;

/// Every `$ref` target used anywhere in `entry`
pub fn collect_refs(entry: &SchemaEntry) -> HashSet<String> {
    let mut refs = HashSet::new();
    let mut stack: Vec<&SchemaProperty> = entry.nodes().collect();
    while let Some(node) = stack.pop() {
        if let Some(target) = &node.common.reference {
            refs.insert(target.clone());
        }
        stack.extend(node.children());
    }
    refs
}

/// Check that every `$ref` in every namespace resolves.
///
/// Accepted targets, in order: builtin names (`any`, `boolean` and the targets
/// of the configured ref mappings), `namespace.Id` for a type of another
/// namespace, a type of the current namespace, a type of a namespace reached
/// through the `$import` chain.
///
/// The only `$extend` markers left at this point are the listener pointers on
/// top-level events; any other one fails the check.
pub fn verify(namespaces: &Namespaces, config: &PipelineConfig) -> Result<()> {
    let mut builtins: HashSet<&str> = ["any", "boolean"].into_iter().collect();
    builtins.extend(config.ref_mappings.iter().map(|m| m.to.as_str()));

    let mut checked = 0usize;
    for namespace in namespaces.iter() {
        namespace.entry.check_extend_placement(NodeKind::Event)?;
        let mut refs: Vec<String> = collect_refs(&namespace.entry).into_iter().collect();
        refs.sort();
        for reference in refs {
            checked += 1;
            if builtins.contains(reference.as_str()) || resolves(namespaces, &namespace.entry, &reference) {
                continue;
            }
            return Err(SchemaError::UnresolvedReference {
                reference,
                namespace: namespace.name().to_string(),
            });
        }
    }
    tracing::debug!(refs = checked, "references verified");
    Ok(())
}

fn resolves(namespaces: &Namespaces, entry: &SchemaEntry, reference: &str) -> bool {
    if let Some((namespace, id)) = reference.rsplit_once('.') {
        return namespaces
            .primary(namespace)
            .is_some_and(|ns| ns.entry.find_type(id).is_some());
    }

    let mut current = Some(entry);
    let mut seen = HashSet::new();
    while let Some(entry) = current {
        if entry.find_type(reference).is_some() {
            return true;
        }
        if !seen.insert(entry.namespace.as_str()) {
            return false;
        }
        current = entry
            .import
            .as_deref()
            .and_then(|name| namespaces.primary(name))
            .map(|ns| &ns.entry);
    }
    false
}
