//! Applies the hand-written patch files of a namespace

use crate::error::Result;
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::patch::{apply_patches, PatchFile, PatchSet};
use crate::schema::SchemaEntry;
use crate::visitor::{SchemaVisitor, Visit};

use super::Fix;

pub struct ApplyJsonFixes {
    name: &'static str,
    patches: PatchSet,
}

impl ApplyJsonFixes {
    /// Patches applied before the structural fixes
    pub fn early(patches: PatchSet) -> Self {
        Self {
            name: "apply early manual json fixes",
            patches,
        }
    }

    /// Patches applied after reference cleanup
    pub fn late(patches: PatchSet) -> Self {
        Self {
            name: "apply manual json fixes",
            patches,
        }
    }
}

impl Fix for ApplyJsonFixes {
    fn name(&self) -> &'static str {
        self.name
    }

    fn visitor<'a>(
        &'a self,
        namespace: &ImportedNamespace,
        _namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        Ok(self
            .patches
            .get(namespace.name())
            .map(|patches| Box::new(Patcher(patches)) as Box<dyn SchemaVisitor + 'a>))
    }
}

struct Patcher<'a>(&'a PatchFile);

impl SchemaVisitor for Patcher<'_> {
    fn visit_namespace(&mut self, entry: SchemaEntry) -> Result<Visit<SchemaEntry>> {
        Ok(Visit::Keep(apply_patches(entry, self.0)?))
    }
}
