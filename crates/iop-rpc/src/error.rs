//! # RPC Errors
//!
//! [`RegistryError`] is a setup-time error: it is returned while the
//! registry is being built and is fatal to startup. [`RpcError`] is a
//! per-call error: it is always returned to the caller and maps onto a
//! response status on the wire.

use thiserror::Error;

/// Registry setup failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A route was bound twice.
    #[error("duplicate registration for {route}")]
    DuplicateRegistration { route: String },

    /// The schema declares no such module, member, or method.
    #[error("cannot bind {route}: {reason}")]
    UnknownRoute { route: String, reason: String },
}

/// Category of a dispatch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorKind {
    /// No module, member, or method by that name, or no handler bound to it.
    NotFound,
    /// The request payload does not decode against the method's arguments.
    BadRequest,
    /// The handler failed, or replied with a value its method does not declare.
    AppError,
}

impl RpcErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::AppError => "app_error",
        }
    }
}

impl std::fmt::Display for RpcErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed dispatch.
///
/// `payload` is what goes back on the wire with the error status: the
/// encoded exception struct when a handler raised a declared exception,
/// otherwise the UTF-8 bytes of `message`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct RpcError {
    pub kind: RpcErrorKind,
    pub message: String,
    pub payload: Vec<u8>,
}

impl RpcError {
    fn with_message(kind: RpcErrorKind, message: String) -> Self {
        Self {
            kind,
            payload: message.as_bytes().to_vec(),
            message,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(RpcErrorKind::NotFound, message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(RpcErrorKind::BadRequest, message.into())
    }

    pub fn app_error(message: impl Into<String>) -> Self {
        Self::with_message(RpcErrorKind::AppError, message.into())
    }

    /// An application failure carrying an encoded exception struct.
    pub fn exception(payload: Vec<u8>) -> Self {
        Self {
            kind: RpcErrorKind::AppError,
            message: "handler raised an exception".to_string(),
            payload,
        }
    }
}

impl From<RegistryError> for iop_core::IopError {
    fn from(err: RegistryError) -> Self {
        iop_core::IopError::Rpc(err.to_string())
    }
}

impl From<RpcError> for iop_core::IopError {
    fn from(err: RpcError) -> Self {
        iop_core::IopError::Rpc(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_errors_carry_utf8_payload() {
        let err = RpcError::not_found("Course.user.nope");
        assert_eq!(err.kind, RpcErrorKind::NotFound);
        assert_eq!(err.payload, b"Course.user.nope");
        assert_eq!(err.to_string(), "not_found: Course.user.nope");
    }

    #[test]
    fn test_exception_keeps_encoded_payload() {
        let err = RpcError::exception(vec![0x01, 0x02, b'x', 0x00]);
        assert_eq!(err.kind, RpcErrorKind::AppError);
        assert_eq!(err.payload, vec![0x01, 0x02, b'x', 0x00]);
    }

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::DuplicateRegistration {
            route: "Course.user.create".into(),
        };
        assert_eq!(err.to_string(), "duplicate registration for Course.user.create");
    }
}
