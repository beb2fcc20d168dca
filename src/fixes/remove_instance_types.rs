//! Drops marker types such as `...InstanceType`

use crate::error::Result;
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::schema::SchemaProperty;
use crate::visitor::{SchemaVisitor, Visit};

use super::Fix;

pub struct RemoveInstanceTypes {
    suffix: String,
}

impl RemoveInstanceTypes {
    pub fn new(suffix: String) -> Self {
        Self { suffix }
    }
}

impl Fix for RemoveInstanceTypes {
    fn name(&self) -> &'static str {
        "remove instance types"
    }

    fn visitor<'a>(
        &'a self,
        _namespace: &ImportedNamespace,
        _namespaces: &'a mut Namespaces,
    ) -> Result<Option<Box<dyn SchemaVisitor + 'a>>> {
        Ok(Some(Box::new(SuffixFilter(&self.suffix))))
    }
}

struct SuffixFilter<'a>(&'a str);

impl SchemaVisitor for SuffixFilter<'_> {
    fn visit_type(&mut self, node: SchemaProperty) -> Result<Visit<SchemaProperty>> {
        match &node.common.id {
            Some(id) if id.ends_with(self.0) => Ok(Visit::Remove),
            _ => Ok(Visit::Keep(node)),
        }
    }
}
