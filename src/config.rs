//! Configuration management for the normalizer
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (normalize.toml)
//! - Environment variables (NORMALIZE__*)
//!
//! ## Example config file (normalize.toml):
//! ```toml
//! [input]
//! schema_dir = "./schemas"
//! skip_files = ["native_manifest.json"]
//! extension_files = ["menus_child.json", "user_scripts_content.json"]
//!
//! [fixes]
//! early_fixes_dir = "./early-fixes"
//! fixes_dir = "./fixes"
//!
//! [pipeline]
//! strict_types = true
//! instance_type_suffix = "InstanceType"
//!
//! [[pipeline.ref_mappings]]
//! from = "UnrecognizedProperty"
//! to = "any"
//!
//! [output]
//! dir = "./out"
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the normalizer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Where schema files come from and how they are classified
    #[serde(default)]
    pub input: InputConfig,

    /// Manual patch directories
    #[serde(default)]
    pub fixes: FixesConfig,

    /// Settings of the individual pipeline passes
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Export settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory holding the schema JSON files
    #[serde(default = "default_schema_dir")]
    pub schema_dir: PathBuf,

    /// File names that are never loaded
    #[serde(default = "default_skip_files")]
    pub skip_files: Vec<String>,

    /// Namespaces dropped while loading
    #[serde(default = "default_skip_namespaces")]
    pub skip_namespaces: Vec<String>,

    /// Files whose namespaces always extend a primary namespace
    #[serde(default = "default_extension_files")]
    pub extension_files: Vec<String>,

    /// Permission-only entries that are still primary namespaces
    #[serde(default = "default_permission_only_primary")]
    pub permission_only_primary: Vec<String>,
}

/// Manual patch directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixesConfig {
    /// Patches applied before the structural passes
    #[serde(default = "default_early_fixes_dir")]
    pub early_fixes_dir: PathBuf,

    /// Patches applied after reference cleanup
    #[serde(default = "default_fixes_dir")]
    pub fixes_dir: PathBuf,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fail on nodes whose type cannot be guessed
    #[serde(default = "default_true")]
    pub strict_types: bool,

    /// Namespaces removed by the first pass
    #[serde(default = "default_unused_namespaces")]
    pub unused_namespaces: Vec<String>,

    /// Types whose id ends with this suffix are dropped
    #[serde(default = "default_instance_type_suffix")]
    pub instance_type_suffix: String,

    /// `additionalProperties` refs that carry no information
    #[serde(default = "default_ignored_additional_properties")]
    pub ignored_additional_properties: Vec<String>,

    /// `$ref` targets rewritten to simpler ones
    #[serde(default = "default_ref_mappings")]
    pub ref_mappings: Vec<RefMapping>,

    /// Namespace providing the `Event` type used by extended events
    #[serde(default = "default_events_namespace")]
    pub events_namespace: String,

    /// Verify every `$ref` after the pipeline
    #[serde(default = "default_true")]
    pub check_references: bool,
}

/// A `$ref` rewrite. Kept as a record list since config keys are case-folded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefMapping {
    pub from: String,
    pub to: String,
}

impl RefMapping {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Replacement for a `$ref` target, if one is configured
    pub fn mapped_ref(&self, target: &str) -> Option<&str> {
        self.ref_mappings
            .iter()
            .find(|m| m.from == target)
            .map(|m| m.to.as_str())
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Output format (pretty or compact)
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from("schemas")
}

fn default_skip_files() -> Vec<String> {
    vec!["native_manifest.json".to_string()]
}

fn default_skip_namespaces() -> Vec<String> {
    vec!["test".to_string()]
}

fn default_extension_files() -> Vec<String> {
    vec![
        "menus_child.json".to_string(),
        "user_scripts_content.json".to_string(),
    ]
}

fn default_permission_only_primary() -> Vec<String> {
    vec!["privacy".to_string()]
}

fn default_early_fixes_dir() -> PathBuf {
    PathBuf::from("early-fixes")
}

fn default_fixes_dir() -> PathBuf {
    PathBuf::from("fixes")
}

fn default_unused_namespaces() -> Vec<String> {
    vec!["test".to_string()]
}

fn default_instance_type_suffix() -> String {
    "InstanceType".to_string()
}

fn default_ignored_additional_properties() -> Vec<String> {
    vec![
        "UnrecognizedProperty".to_string(),
        "ImageDataOrExtensionURL".to_string(),
        "ThemeColor".to_string(),
    ]
}

fn default_ref_mappings() -> Vec<RefMapping> {
    vec![
        RefMapping::new("UnrecognizedProperty", "any"),
        RefMapping::new("PersistentBackgroundProperty", "boolean"),
    ]
}

fn default_events_namespace() -> String {
    "events".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            schema_dir: default_schema_dir(),
            skip_files: default_skip_files(),
            skip_namespaces: default_skip_namespaces(),
            extension_files: default_extension_files(),
            permission_only_primary: default_permission_only_primary(),
        }
    }
}

impl Default for FixesConfig {
    fn default() -> Self {
        Self {
            early_fixes_dir: default_early_fixes_dir(),
            fixes_dir: default_fixes_dir(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strict_types: true,
            unused_namespaces: default_unused_namespaces(),
            instance_type_suffix: default_instance_type_suffix(),
            ignored_additional_properties: default_ignored_additional_properties(),
            ref_mappings: default_ref_mappings(),
            events_namespace: default_events_namespace(),
            check_references: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::Pretty,
        }
    }
}

impl NormalizeConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["normalize.toml", ".normalize.toml", "config/normalize.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "webext", "schema-normalize") {
            let xdg_config = config_dir.config_dir().join("normalize.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (NORMALIZE__*)
        builder = builder.add_source(
            Environment::with_prefix("NORMALIZE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Resolve a configured path against `base` unless it is absolute
    pub fn resolve(base: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }

    /// Point every configured directory at `root`
    pub fn rooted_at(mut self, root: &Path) -> Self {
        self.input.schema_dir = Self::resolve(root, &self.input.schema_dir);
        self.fixes.early_fixes_dir = Self::resolve(root, &self.fixes.early_fixes_dir);
        self.fixes.fixes_dir = Self::resolve(root, &self.fixes.fixes_dir);
        self.output.dir = Self::resolve(root, &self.output.dir);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NormalizeConfig::default();
        assert!(config.pipeline.strict_types);
        assert!(config.pipeline.check_references);
        assert_eq!(config.input.extension_files.len(), 2);
        assert_eq!(config.pipeline.mapped_ref("UnrecognizedProperty"), Some("any"));
        assert_eq!(config.pipeline.mapped_ref("Tab"), None);
    }

    #[test]
    fn test_serialize_config() {
        let config = NormalizeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[input]"));
        assert!(toml_str.contains("[pipeline]"));
        assert!(toml_str.contains("[output]"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[pipeline]\nstrict_types = false\nevents_namespace = \"ev\"\n\n[output]\nformat = \"compact\"\n",
        )
        .unwrap();

        let config = NormalizeConfig::load_from(path.to_str()).unwrap();
        assert!(!config.pipeline.strict_types);
        assert_eq!(config.pipeline.events_namespace, "ev");
        assert_eq!(config.output.format, OutputFormat::Compact);
        assert_eq!(config.pipeline.instance_type_suffix, "InstanceType");
        assert_eq!(config.input.skip_files, vec!["native_manifest.json".to_string()]);
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = NormalizeConfig::default();
        config.pipeline.unused_namespaces.push("experimental".to_string());
        config.save(&path).unwrap();

        let loaded = NormalizeConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.pipeline.unused_namespaces, vec!["test", "experimental"]);
    }

    #[test]
    fn test_rooted_at() {
        let config = NormalizeConfig::default().rooted_at(Path::new("/work"));
        assert_eq!(config.input.schema_dir, PathBuf::from("/work/schemas"));
        assert_eq!(config.fixes.fixes_dir, PathBuf::from("/work/fixes"));
    }
}
