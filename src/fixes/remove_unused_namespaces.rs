//! Drops namespaces that are never exported

use crate::error::Result;
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::schema::SchemaEntry;
use crate::visitor::{SchemaVisitor, Visit};

use super::Fix;

pub struct RemoveUnusedNamespaces {
    unused: Vec<String>,
}

impl RemoveUnusedNamespaces {
    pub fn new(unused: Vec<String>) -> Self {
        Self { unused }
    }
}

impl Fix for RemoveUnusedNamespaces {
    fn name(&self) -> &'static str {
        "remove unused namespaces"
    }

    fn visitor<'a>(
        &'a self,
        _namespace: &ImportedNamespace,
        _namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        Ok(Some(Box::new(Denylist(&self.unused))))
    }
}

struct Denylist<'a>(&'a [String]);

impl SchemaVisitor for Denylist<'_> {
    fn visit_namespace(&mut self, entry: SchemaEntry) -> Result<Visit<SchemaEntry>> {
        if self.0.contains(&entry.namespace) {
            Ok(Visit::Remove)
        } else {
            Ok(Visit::Keep(entry))
        }
    }
}
