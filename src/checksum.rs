//! SHA-256 checksums over loaded schema sources

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex encoded SHA-256 digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Incremental checksum of a set of named files.
///
/// Each file contributes its name and its length-prefixed content, so moving
/// bytes from one file to the next changes the digest.
#[derive(Clone, Default)]
pub struct BundleHasher {
    hasher: Sha256,
    files: usize,
}

impl BundleHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: &str, content: &[u8]) {
        self.hasher.update(name.as_bytes());
        self.hasher.update([0]);
        self.hasher.update((content.len() as u64).to_le_bytes());
        self.hasher.update(content);
        self.files += 1;
    }

    pub fn files(&self) -> usize {
        self.files
    }

    pub fn finish(self) -> Checksum {
        Checksum(format!("{:x}", self.hasher.finalize()))
    }
}
