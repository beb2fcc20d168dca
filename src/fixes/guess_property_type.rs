//! Gives a tag to nodes that were left untyped at ingestion

use crate::error::Result;
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::schema::classify::reclassify;
use crate::schema::SchemaProperty;
use crate::visitor::{NodeKind, SchemaVisitor, Visit};

use super::Fix;

pub struct GuessPropertyType {
    strict: bool,
}

impl GuessPropertyType {
    /// With `strict`, a node whose tag still cannot be guessed fails the run
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }
}

impl Fix for GuessPropertyType {
    fn name(&self) -> &'static str {
        "guess property types"
    }

    fn visitor<'a>(
        &'a self,
        _namespace: &ImportedNamespace,
        _namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        Ok(Some(Box::new(TypeGuesser { strict: self.strict })))
    }
}

struct TypeGuesser {
    strict: bool,
}

impl SchemaVisitor for TypeGuesser {
    fn visit_node(&mut self, kind: NodeKind, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        match kind {
            NodeKind::Property | NodeKind::Parameter | NodeKind::Returns | NodeKind::Type => {
                Ok(Visit::Keep(reclassify(node, self.strict)?))
            }
            _ => Ok(Visit::Keep(node)),
        }
    }
}
