//! WebExtension Schema Normalizer
//!
//! Reads the browser's WebExtension API schema files and rewrites them into a
//! regular form a declaration renderer can consume without special cases.
//!
//! ## Features
//!
//! - **Typed Schema Model**: every node is classified once into a tagged union
//! - **Ordered Fix Pipeline**: each fix runs over every namespace before the next
//! - **Manual Patches**: per-namespace JSON patch files for one-off upstream quirks
//! - **Reference Checking**: dangling `$ref` targets fail the run
//! - **Checksums**: SHA256 over the loaded sources, recorded in the export index
//!
//! ## Architecture
//!
//! ```text
//! schemas/*.json
//!   └─ loader ──────────── comments split off, entries classified
//!        └─ Namespaces ─── arena, one primary declaration per namespace
//!             └─ Pipeline ─ fixes, each a SchemaVisitor factory
//!                  └─ references::verify
//!                       └─ export ── out/<namespace>.json + index.json
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod export;
pub mod fixes;
pub mod loader;
pub mod names;
pub mod namespace;
pub mod patch;
pub mod references;
pub mod schema;
pub mod visitor;

pub use checksum::Checksum;
pub use config::NormalizeConfig;
pub use error::{Result, SchemaError};
pub use fixes::{Fix, Pipeline};
pub use loader::{load_schema_dir, LoadedBundle};
pub use namespace::{ImportedNamespace, Namespaces};
pub use schema::{PropertyKind, SchemaEntry, SchemaProperty};
pub use visitor::{NodeKind, SchemaVisitor, Visit};

/// Run the standard pipeline over `namespaces`, then check references when
/// configured to
pub fn normalize(config: &NormalizeConfig, namespaces: &mut Namespaces) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    pipeline.run(namespaces)?;
    if config.pipeline.check_references {
        references::verify(namespaces, &config.pipeline)?;
    }
    Ok(())
}
