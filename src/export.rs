//! Writes the normalized forest for the renderer
//!
//! Every namespace becomes `<namespace>.json` holding its source file, its
//! normalized comment block and the entry. `index.json` lists the namespaces
//! in export order together with the checksum of the sources.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::config::{OutputConfig, OutputFormat};
use crate::error::Result;
use crate::namespace::{ImportedNamespace, Namespaces};
use crate::schema::SchemaEntry;

/// On-disk form of one namespace
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportedNamespace {
    pub file: String,
    pub comments: String,
    pub entry: SchemaEntry,
}

impl From<&ImportedNamespace> for ExportedNamespace {
    fn from(namespace: &ImportedNamespace) -> Self {
        Self {
            file: namespace.file.clone(),
            comments: namespace.comments.clone(),
            entry: namespace.entry.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportIndex {
    pub namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
}

fn to_string<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    })
}

/// Write all namespaces to `output.dir`. Returns the written files.
pub fn export(namespaces: &Namespaces, checksum: Option<&Checksum>, output: &OutputConfig) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&output.dir)?;

    let mut written = Vec::with_capacity(namespaces.len() + 1);
    let mut names = Vec::with_capacity(namespaces.len());
    for namespace in namespaces.iter() {
        let path = output.dir.join(format!("{}.json", namespace.name()));
        write(&path, &to_string(&ExportedNamespace::from(namespace), output.format)?)?;
        names.push(namespace.name().to_string());
        written.push(path);
    }

    let index = ExportIndex {
        namespaces: names,
        checksum: checksum.cloned(),
    };
    let path = output.dir.join("index.json");
    write(&path, &to_string(&index, output.format)?)?;
    written.push(path);

    tracing::info!(dir = %output.dir.display(), namespaces = namespaces.len(), "exported");
    Ok(written)
}

fn write(path: &Path, content: &str) -> Result<()> {
    tracing::debug!(path = %path.display(), bytes = content.len(), "writing");
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::ExtensionRules;
    use serde_json::json;
    use tempfile::TempDir;

    fn namespaces() -> Namespaces {
        let tabs = SchemaEntry::from_value(json!({
            "namespace": "tabs",
            "types": [{ "id": "Tab", "type": "object", "properties": { "id": { "type": "integer", "optional": true } } }]
        }))
        .unwrap();
        let windows = SchemaEntry::from_value(json!({ "namespace": "windows", "functions": [] })).unwrap();
        let rules = ExtensionRules::default();
        Namespaces::from_vec(vec![
            ImportedNamespace::new("tabs.json", "// License", tabs, &rules).unwrap(),
            ImportedNamespace::new("windows.json", "", windows, &rules).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_export_writes_namespaces_and_index() {
        let dir = TempDir::new().unwrap();
        let output = OutputConfig {
            dir: dir.path().join("out"),
            format: OutputFormat::Pretty,
        };
        let mut hasher = crate::checksum::BundleHasher::new();
        hasher.add_file("tabs.json", b"sources");
        let checksum = hasher.finish();
        let written = export(&namespaces(), Some(&checksum), &output).unwrap();
        assert_eq!(written.len(), 3);

        let tabs: ExportedNamespace =
            serde_json::from_str(&fs::read_to_string(output.dir.join("tabs.json")).unwrap()).unwrap();
        assert_eq!(tabs.file, "tabs.json");
        assert_eq!(tabs.comments, "License");
        assert_eq!(tabs.entry.find_type("Tab").unwrap().to_value().unwrap()["properties"]["id"]["optional"], true);

        let index: ExportIndex =
            serde_json::from_str(&fs::read_to_string(output.dir.join("index.json")).unwrap()).unwrap();
        assert_eq!(index.namespaces, vec!["tabs", "windows"]);
        assert_eq!(index.checksum, Some(checksum));
    }

    #[test]
    fn test_compact_output() {
        let dir = TempDir::new().unwrap();
        let output = OutputConfig {
            dir: dir.path().to_path_buf(),
            format: OutputFormat::Compact,
        };
        export(&namespaces(), None, &output).unwrap();
        let content = fs::read_to_string(dir.path().join("windows.json")).unwrap();
        assert!(!content.contains('\n'));
        assert!(!fs::read_to_string(dir.path().join("index.json")).unwrap().contains("checksum"));
    }
}
