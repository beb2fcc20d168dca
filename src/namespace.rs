//! Imported namespaces
//!
//! An [`ImportedNamespace`] wraps one [`SchemaEntry`] together with the file it
//! came from and that file's leading comment block. Several files may declare the
//! same namespace: exactly one of them is the primary declaration, the others are
//! extension fragments that get merged into it.
//!
//! [`Namespaces`] is the arena the pipeline runs over. Slots have stable indices
//! for the duration of a pass, so a pass can take one namespace out, look up or
//! mutate another, and put the first one back.

use crate::config::InputConfig;
use crate::error::{Result, SchemaError};
use crate::schema::SchemaEntry;
use crate::visitor::NodeKind;

/// Rules deciding whether a namespace is an extension fragment
#[derive(Debug, Clone, Default)]
pub struct ExtensionRules {
    /// Files whose namespaces are always extensions
    pub extension_files: Vec<String>,
    /// Permission-only namespaces that are nevertheless primary
    pub permission_only_primary: Vec<String>,
}

impl From<&InputConfig> for ExtensionRules {
    fn from(input: &InputConfig) -> Self {
        Self {
            extension_files: input.extension_files.clone(),
            permission_only_primary: input.permission_only_primary.clone(),
        }
    }
}

impl ExtensionRules {
    pub fn is_extension(&self, file: &str, entry: &SchemaEntry) -> bool {
        self.extension_files.iter().any(|f| f == file)
            || entry
                .types
                .as_ref()
                .is_some_and(|types| types.iter().any(|t| t.common.extend.is_some()))
            || (entry.is_permissions_only()
                && !self.permission_only_primary.contains(&entry.namespace))
    }
}

#[derive(Debug, Clone)]
pub struct ImportedNamespace {
    pub file: String,
    pub is_extension: bool,
    pub comments: String,
    pub entry: SchemaEntry,
}

impl ImportedNamespace {
    /// Wrap a parsed entry. `comments` is the raw leading comment block of the file.
    pub fn new(
        file: impl Into<String>,
        comments: &str,
        entry: SchemaEntry,
        rules: &ExtensionRules,
    ) -> Result<Self> {
        let file = file.into();
        entry.check_extend_placement(NodeKind::Type)?;
        let comments = normalize_comments(comments)?;
        let is_extension = rules.is_extension(&file, &entry);
        Ok(Self {
            file,
            is_extension,
            comments,
            entry,
        })
    }

    pub fn name(&self) -> &str {
        &self.entry.namespace
    }

    /// Append another comment block unless its text is already present
    pub fn append_comments(&mut self, comments: &str) {
        if !self.comments.contains(comments) {
            self.comments.push_str("\n\n");
            self.comments.push_str(comments);
        }
    }
}

/// Strip the comment markers from every line of a leading comment block
pub fn normalize_comments(comments: &str) -> Result<String> {
    let lines = comments
        .split('\n')
        .map(|line| {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("// ").or_else(|| line.strip_prefix("/* ")) {
                let rest = rest.strip_suffix("*/").unwrap_or(rest);
                Ok(rest.trim().to_string())
            } else if let Some(rest) = line.strip_prefix("* ") {
                Ok(rest.strip_suffix("*/").unwrap_or(rest).trim().to_string())
            } else if line.is_empty() || line == "//" || line == "*" || line == "*/" {
                Ok(String::new())
            } else {
                Err(SchemaError::InvalidFormat(format!("Unknown comment style: {line}")))
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(lines.join("\n"))
}

/// Arena of all imported namespaces
#[derive(Debug, Default)]
pub struct Namespaces {
    slots: Vec<Option<ImportedNamespace>>,
}

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace, rejecting a second primary declaration of the same name
    pub fn insert(&mut self, namespace: ImportedNamespace) -> Result<()> {
        if !namespace.is_extension {
            if let Some(existing) = self.primary(namespace.name()) {
                return Err(SchemaError::DuplicateNamespace {
                    namespace: namespace.entry.namespace.clone(),
                    file: existing.file.clone(),
                });
            }
        }
        self.slots.push(Some(namespace));
        Ok(())
    }

    pub fn from_vec(namespaces: Vec<ImportedNamespace>) -> Result<Self> {
        let mut arena = Self::new();
        for namespace in namespaces {
            arena.insert(namespace)?;
        }
        Ok(arena)
    }

    /// The primary declaration of `name`
    pub fn primary(&self, name: &str) -> Option<&ImportedNamespace> {
        self.iter().find(|ns| !ns.is_extension && ns.name() == name)
    }

    /// Mutable access to the primary declaration of `name`. Only the extension
    /// merge writes to a namespace other than the one being visited.
    pub fn primary_mut(&mut self, name: &str) -> Option<&mut ImportedNamespace> {
        self.iter_mut().find(|ns| !ns.is_extension && ns.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImportedNamespace> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ImportedNamespace> {
        self.slots.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<ImportedNamespace> {
        self.slots.into_iter().flatten().collect()
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn take(&mut self, index: usize) -> Option<ImportedNamespace> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub(crate) fn restore(&mut self, index: usize, namespace: ImportedNamespace) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(namespace);
        }
    }

    /// Drop the slots emptied by removals
    pub(crate) fn compact(&mut self) {
        self.slots.retain(Option::is_some);
    }
}
