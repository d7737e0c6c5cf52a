//! # Codec Errors
//!
//! Encode errors mean the caller built a value that does not fit its type.
//! Decode errors mean the bytes do not fit the type. Both are scoped to the
//! single call that produced them; every variant names the type involved and
//! decode errors carry the byte offset where decoding stopped.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// The value's shape does not match the declared type.
    #[error("{type_name}: expected {expected}, found {found} value")]
    TypeMismatch {
        type_name: String,
        expected: String,
        found: &'static str,
    },

    /// A required field without default is absent.
    #[error("{type_name}: missing required field '{field}' (tag {tag})")]
    MissingRequiredField {
        type_name: String,
        field: String,
        tag: u16,
    },

    /// Explicit null on a required field.
    #[error("{type_name}: field '{field}' (tag {tag}) is required and cannot be null")]
    NullNotAllowed {
        type_name: String,
        field: String,
        tag: u16,
    },

    /// The struct value carries a tag its type does not declare.
    #[error("{type_name}: no field with tag {tag}")]
    UnknownField { type_name: String, tag: u16 },

    #[error("{type_name}: no variant with tag {tag}")]
    UnknownUnionTag { type_name: String, tag: u16 },

    #[error("{type_name}: {value} is not a member value")]
    UnknownEnumValue { type_name: String, value: i32 },

    /// A block or array does not fit its 32-bit length prefix.
    #[error("{type_name}: length {len} exceeds the wire limit")]
    TooLarge { type_name: String, len: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// A required field without default is not on the wire.
    #[error("{type_name}: missing required field '{field}' (tag {tag}) at offset {offset}")]
    MissingRequiredField {
        type_name: String,
        field: String,
        tag: u16,
        offset: usize,
    },

    #[error("{type_name}: unknown variant tag {tag} at offset {offset}")]
    UnknownUnionTag {
        type_name: String,
        tag: u16,
        offset: usize,
    },

    #[error("{type_name}: unknown enum value {value} at offset {offset}")]
    UnknownEnumValue {
        type_name: String,
        value: i64,
        offset: usize,
    },

    /// Truncated input, wrong wire kind, bad UTF-8, and similar.
    #[error("malformed bytes for {type_name} at offset {offset}: {reason}")]
    Malformed {
        type_name: String,
        offset: usize,
        reason: String,
    },

    #[error("{type_name}: nesting deeper than {limit} at offset {offset}")]
    DepthExceeded {
        type_name: String,
        limit: usize,
        offset: usize,
    },

    #[error("payload of {len} bytes exceeds limit of {limit}")]
    PayloadTooLarge { len: usize, limit: usize },
}

impl DecodeError {
    /// Byte offset at which decoding failed, if the error has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::MissingRequiredField { offset, .. }
            | Self::UnknownUnionTag { offset, .. }
            | Self::UnknownEnumValue { offset, .. }
            | Self::Malformed { offset, .. }
            | Self::DepthExceeded { offset, .. } => Some(*offset),
            Self::PayloadTooLarge { .. } => None,
        }
    }
}

impl From<EncodeError> for iop_core::IopError {
    fn from(err: EncodeError) -> Self {
        iop_core::IopError::Encode(err.to_string())
    }
}

impl From<DecodeError> for iop_core::IopError {
    fn from(err: DecodeError) -> Self {
        iop_core::IopError::Decode(err.to_string())
    }
}
