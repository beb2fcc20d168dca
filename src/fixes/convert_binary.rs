//! Chrome's `binary` tag is structurally an `object`

use crate::error::Result;
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::schema::{PropertyKind, SchemaProperty};
use crate::visitor::{NodeKind, SchemaVisitor, Visit};

use super::Fix;

pub struct ConvertBinaryToObject;

impl Fix for ConvertBinaryToObject {
    fn name(&self) -> &'static str {
        "convert binary types to object types"
    }

    fn visitor<'a>(
        &'a self,
        _namespace: &ImportedNamespace,
        _namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        Ok(Some(Box::new(BinaryToObject)))
    }
}

struct BinaryToObject;

impl SchemaVisitor for BinaryToObject {
    fn visit_node(&mut self, _kind: NodeKind, mut node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        if let PropertyKind::Binary(object) = node.kind {
            node.kind = PropertyKind::Object(object);
        }
        Ok(Visit::Keep(node))
    }
}
