//! # Dispatch Configuration
//!
//! Plain serde struct, loadable from YAML/JSON next to the schema or from
//! the environment:
//!
//! | variable                | field                        | default |
//! |-------------------------|------------------------------|---------|
//! | `IOP_MAX_PAYLOAD_BYTES` | `limits.max_payload_len`     | 64 MiB  |
//! | `IOP_MAX_DECODE_DEPTH`  | `limits.max_depth`           | 64      |
//! | `IOP_METRICS_ENABLED`   | `metrics_enabled`            | true    |
//!
//! Metrics are on unless `IOP_METRICS_ENABLED` is `false`. They go through
//! the `metrics` facade, so nothing is recorded until the host process
//! installs a recorder.

use iop_codec::CodecLimits;
use iop_core::IopError;
use serde::{Deserialize, Serialize};

pub const ENV_MAX_PAYLOAD_BYTES: &str = "IOP_MAX_PAYLOAD_BYTES";
pub const ENV_MAX_DECODE_DEPTH: &str = "IOP_MAX_DECODE_DEPTH";
pub const ENV_METRICS_ENABLED: &str = "IOP_METRICS_ENABLED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Limits applied when decoding request payloads.
    pub limits: CodecLimits,
    /// Record `iop_dispatch_*` metrics.
    pub metrics_enabled: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            limits: CodecLimits::default(),
            metrics_enabled: true,
        }
    }
}

impl DispatchConfig {
    /// Defaults overridden by whichever `IOP_*` variables are set.
    pub fn from_env() -> Result<Self, IopError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, IopError> {
        let mut config = Self::default();
        if let Some(v) = lookup(ENV_MAX_PAYLOAD_BYTES) {
            config.limits.max_payload_len = parse_usize(ENV_MAX_PAYLOAD_BYTES, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_DECODE_DEPTH) {
            config.limits.max_depth = parse_usize(ENV_MAX_DECODE_DEPTH, &v)?;
        }
        if let Some(v) = lookup(ENV_METRICS_ENABLED) {
            config.metrics_enabled = v.trim().to_lowercase() != "false";
        }
        Ok(config)
    }
}

fn parse_usize(name: &str, value: &str) -> Result<usize, IopError> {
    value
        .trim()
        .parse()
        .map_err(|e| IopError::Configuration(format!("{name}={value:?}: {e}")))
}
