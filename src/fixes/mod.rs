//! Normalization pipeline
//!
//! Each fix is a visitor factory: for every namespace it decides whether it
//! applies and, if so, hands back a [`SchemaVisitor`] for the walker. A fix runs
//! over every namespace before the next fix starts, since later fixes rely on
//! what earlier ones established (inline extraction assumes extensions are
//! merged, enum flattening assumes inline enums were hoisted).
//!
//! While a namespace is visited it is taken out of the arena, so a factory gets
//! the namespace itself plus mutable access to all the others.

pub mod cleanup_refs;
pub mod convert_binary;
pub mod extend_events;
pub mod extension_namespace;
pub mod extract_inline;
pub mod flatten_choice_enum;
pub mod guess_property_type;
pub mod json_fixes;
pub mod remove_instance_types;
pub mod remove_unsupported;
pub mod remove_unused_namespaces;
pub mod skipable_parameters;
pub mod unused_additional_properties;

use crate::config::NormalizeConfig;
use crate::error::{Result, SchemaError};
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::patch::PatchSet;
use crate::visitor::{walk_namespace, NodeKind, SchemaVisitor};

pub use cleanup_refs::CleanupRefs;
pub use convert_binary::ConvertBinaryToObject;
pub use extend_events::ExtendEvents;
pub use extension_namespace::ApplyExtensionNamespace;
pub use extract_inline::ExtractInlineContent;
pub use flatten_choice_enum::FlattenChoiceEnum;
pub use guess_property_type::GuessPropertyType;
pub use json_fixes::ApplyJsonFixes;
pub use remove_instance_types::RemoveInstanceTypes;
pub use remove_unsupported::RemoveUnsupported;
pub use remove_unused_namespaces::RemoveUnusedNamespaces;
pub use skipable_parameters::DetectSkipableParameters;
pub use unused_additional_properties::RemoveUnusedAdditionalProperties;

/// A named visitor factory
pub trait Fix {
    fn name(&self) -> &'static str;

    /// The visitor for `namespace`, or `None` when the fix does not apply to it.
    /// `namespaces` holds every other namespace.
    fn visitor<'a>(
        &'a self,
        namespace: &ImportedNamespace,
        namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>>;
}

/// Run one fix over every namespace
pub fn apply_fix(fix: &dyn Fix, namespaces: &mut Namespaces) -> Result<()> {
    tracing::info!(fix = fix.name(), namespaces = namespaces.len(), "applying fix");

    for index in 0..namespaces.slot_count() {
        let Some(mut current) = namespaces.take(index) else {
            continue;
        };

        let keep = match fix
            .visitor(&current, namespaces)
            .map_err(|e| SchemaError::in_pass(&current.file, fix.name(), NodeKind::Namespace, e))?
        {
            Some(mut visitor) => {
                tracing::debug!(fix = fix.name(), namespace = %current.name(), file = %current.file, "visiting");
                walk_namespace(&mut current, visitor.as_mut(), fix.name())?
            }
            None => true,
        };

        if keep {
            namespaces.restore(index, current);
        } else {
            tracing::debug!(fix = fix.name(), namespace = %current.name(), file = %current.file, "removed namespace");
        }
    }

    namespaces.compact();
    Ok(())
}

/// The ordered list of fixes
pub struct Pipeline {
    fixes: Vec<Box<dyn Fix>>,
}

impl Pipeline {
    /// An empty pipeline
    pub fn new() -> Self {
        Self { fixes: Vec::new() }
    }

    /// The standard pipeline. Reads the patch directories named in `config`.
    pub fn from_config(config: &NormalizeConfig) -> Result<Self> {
        let pipeline = &config.pipeline;
        let early = PatchSet::load_dir(&config.fixes.early_fixes_dir)?;
        let late = PatchSet::load_dir(&config.fixes.fixes_dir)?;

        Ok(Self::new()
            .with_fix(RemoveUnusedNamespaces::new(pipeline.unused_namespaces.clone()))
            .with_fix(ConvertBinaryToObject)
            .with_fix(RemoveInstanceTypes::new(pipeline.instance_type_suffix.clone()))
            .with_fix(DetectSkipableParameters)
            .with_fix(GuessPropertyType::new(pipeline.strict_types))
            .with_fix(ApplyExtensionNamespace)
            .with_fix(ApplyJsonFixes::early(early))
            .with_fix(RemoveUnusedAdditionalProperties::new(
                pipeline.ignored_additional_properties.clone(),
            ))
            .with_fix(CleanupRefs::new(pipeline.clone()))
            .with_fix(ApplyJsonFixes::late(late))
            .with_fix(ExtractInlineContent)
            .with_fix(FlattenChoiceEnum)
            .with_fix(RemoveUnsupported)
            .with_fix(ExtendEvents::new(pipeline.events_namespace.clone())))
    }

    pub fn with_fix(mut self, fix: impl Fix + 'static) -> Self {
        self.fixes.push(Box::new(fix));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fixes.iter().map(|fix| fix.name()).collect()
    }

    /// Run every fix in order. The first failure aborts the run.
    pub fn run(&self, namespaces: &mut Namespaces) -> Result<()> {
        for fix in &self.fixes {
            apply_fix(fix.as_ref(), namespaces)?;
        }
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use serde_json::Value;

    use super::*;
    use crate::namespace::ExtensionRules;
    use crate::schema::{SchemaEntry, SchemaProperty};

    pub fn namespace(file: &str, entry: Value) -> ImportedNamespace {
        let rules = ExtensionRules::from(&crate::config::InputConfig::default());
        ImportedNamespace::new(file, "", SchemaEntry::from_value(entry).unwrap(), &rules).unwrap()
    }

    pub fn arena(namespaces: Vec<ImportedNamespace>) -> Namespaces {
        Namespaces::from_vec(namespaces).unwrap()
    }

    pub fn run(fix: impl Fix, namespaces: &mut Namespaces) -> Result<()> {
        apply_fix(&fix, namespaces)
    }

    /// Run a fix on a single namespace and return the resulting entry
    pub fn run_single(fix: impl Fix, entry: Value) -> Result<SchemaEntry> {
        let mut namespaces = arena(vec![namespace("test.json", entry)]);
        run(fix, &mut namespaces)?;
        Ok(namespaces.into_vec().remove(0).entry)
    }

    pub fn node(value: Value) -> SchemaProperty {
        SchemaProperty::from_value(value).unwrap()
    }

    pub fn json(entry: &SchemaEntry) -> Value {
        entry.to_value().unwrap()
    }
}
