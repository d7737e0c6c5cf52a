//! # Error Types — Structured Error Hierarchy
//!
//! Each crate in the workspace owns the error enum for its own stage
//! (`ResolveError` in `iop-schema`, `DecodeError` in `iop-codec`, and so on).
//! This module holds the errors of this crate plus [`IopError`], a single
//! type for callers that drive the whole pipeline and only need to report.
//!
//! ## Design
//!
//! - Resolution errors are fatal to startup; no partial schema is published.
//! - Decode and dispatch errors are scoped to one call.
//! - Every error names the type, field tag, or byte offset it concerns.

use thiserror::Error;

/// Top-level error type for the IOP stack.
#[derive(Error, Debug)]
pub enum IopError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The schema could not be loaded or resolved.
    #[error("schema error: {0}")]
    Schema(String),

    /// A value could not be encoded against its type.
    #[error("encode error: {0}")]
    Encode(String),

    /// A payload could not be decoded against its type.
    #[error("decode error: {0}")]
    Decode(String),

    /// Registry setup or dispatch failed.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
