//! # Schema Fingerprint
//!
//! A SHA-256 digest over the canonical bytes of a declaration tree. Peers
//! compare fingerprints to know whether they speak the same schema before
//! relying on field tags lining up.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// SHA-256 fingerprint of a canonicalized declaration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaFingerprint(pub [u8; 32]);

impl SchemaFingerprint {
    /// Render the fingerprint as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Access the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Compute the fingerprint of canonical bytes.
///
/// Accepts only `&CanonicalBytes` so that two spellings of the same tree
/// cannot produce two fingerprints.
pub fn fingerprint(data: &CanonicalBytes) -> SchemaFingerprint {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    SchemaFingerprint(bytes)
}
