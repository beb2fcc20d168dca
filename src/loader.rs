//! Schema file loading
//!
//! Schema files are JSON arrays of namespace entries, preceded by a license
//! comment block and occasionally carrying further comments inside the body.
//! The leading block is kept for the output, every other comment is dropped.

use std::fs;

use walkdir::WalkDir;

use crate::checksum::{BundleHasher, Checksum};
use crate::config::InputConfig;
use crate::error::{Result, SchemaError};
use crate::namespace::{ExtensionRules, ImportedNamespace, Namespaces};
use crate::schema::SchemaEntry;

/// A source file split into its leading comments and its JSON body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitSource {
    pub comments: String,
    pub json: String,
}

/// One parsed schema file
#[derive(Debug, Clone)]
pub struct SchemaFile {
    pub file: String,
    pub comments: String,
    pub entries: Vec<SchemaEntry>,
}

/// Everything loaded from a schema directory
#[derive(Debug)]
pub struct LoadedBundle {
    pub namespaces: Namespaces,
    pub checksum: Checksum,
    pub files: usize,
}

/// Separate comments from JSON. Comments seen before the first JSON text form
/// the leading block; string literals are never searched for comment markers.
pub fn split_comments(text: &str) -> SplitSource {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut split = SplitSource::default();
    let mut comments: Vec<&str> = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < len {
        match (bytes[i], bytes.get(i + 1)) {
            (b'/', Some(b'/')) => {
                flush(&mut split, &text[start..i]);
                let end = text[i..].find(['\r', '\n']).map_or(len, |n| i + n);
                if split.json.is_empty() {
                    comments.push(&text[i..end]);
                }
                i = end;
                start = end;
            }
            (b'/', Some(b'*')) => {
                flush(&mut split, &text[start..i]);
                let end = text[i + 2..].find("*/").map_or(len, |n| i + 2 + n + 2);
                if split.json.is_empty() {
                    comments.push(&text[i..end]);
                }
                i = end;
                start = end;
            }
            (quote @ (b'"' | b'\''), _) => {
                i += 1;
                while i < len && bytes[i] != quote {
                    i += if bytes[i] == b'\\' { 2 } else { 1 };
                }
                i = (i + 1).min(len);
            }
            _ => i += 1,
        }
    }
    flush(&mut split, &text[start..len]);

    split.comments = comments.join("\n");
    split
}

fn flush(split: &mut SplitSource, chunk: &str) {
    if !chunk.trim().is_empty() {
        split.json.push_str(chunk);
    }
}

/// Parse the text of one schema file
pub fn parse_schema_source(file: &str, text: &str) -> Result<SchemaFile> {
    let split = split_comments(text);
    let deserializer = &mut serde_json::Deserializer::from_str(&split.json);
    let entries: Vec<SchemaEntry> = serde_path_to_error::deserialize(deserializer).map_err(|e| SchemaError::Parse {
        file: file.to_string(),
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })?;
    Ok(SchemaFile {
        file: file.to_string(),
        comments: split.comments,
        entries,
    })
}

/// Load every `.json` file of `input.schema_dir`, in file name order
pub fn load_schema_dir(input: &InputConfig) -> Result<LoadedBundle> {
    let rules = ExtensionRules::from(input);
    let mut namespaces = Namespaces::new();
    let mut hasher = BundleHasher::new();

    for entry in WalkDir::new(&input.schema_dir).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| SchemaError::Io(e.into()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(file) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if input.skip_files.iter().any(|skipped| skipped == file) {
            tracing::warn!(file, "skipping schema file");
            continue;
        }

        let text = fs::read_to_string(path)?;
        hasher.add_file(file, text.as_bytes());
        import_file(&mut namespaces, parse_schema_source(file, &text)?, input, &rules)?;
    }

    let files = hasher.files();
    let checksum = hasher.finish();
    tracing::info!(
        dir = %input.schema_dir.display(),
        files,
        namespaces = namespaces.len(),
        checksum = %checksum,
        "loaded schemas"
    );
    Ok(LoadedBundle {
        namespaces,
        checksum,
        files,
    })
}

fn import_file(
    namespaces: &mut Namespaces,
    source: SchemaFile,
    input: &InputConfig,
    rules: &ExtensionRules,
) -> Result<()> {
    for entry in source.entries {
        if input.skip_namespaces.contains(&entry.namespace) {
            tracing::debug!(file = %source.file, namespace = %entry.namespace, "skipping namespace");
            continue;
        }
        let namespace = ImportedNamespace::new(source.file.as_str(), &source.comments, entry, rules)?;
        tracing::debug!(
            file = %namespace.file,
            namespace = %namespace.name(),
            extension = namespace.is_extension,
            "imported namespace"
        );
        namespaces.insert(namespace)?;
    }
    Ok(())
}
