//! Decode-side resource limits.

use serde::{Deserialize, Serialize};

/// Bounds applied while decoding untrusted bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecLimits {
    /// Maximum nesting of structs, unions and arrays.
    pub max_depth: usize,
    /// Maximum size of a top-level payload in bytes.
    pub max_payload_len: usize,
}

impl CodecLimits {
    pub const DEFAULT_MAX_DEPTH: usize = 64;
    pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 64 * 1024 * 1024;
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_payload_len: Self::DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}
