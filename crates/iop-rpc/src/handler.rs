//! # Handler Abstraction
//!
//! A handler implements one interface method. It receives the decoded
//! argument struct and resolves to a reply or a failure; the dispatcher
//! owns encoding both.
//!
//! Any `Fn(StructValue) -> impl Future` closure that is `Send + Sync` is a
//! handler, so most bindings are written inline:
//!
//! ```ignore
//! builder.implement("Course", "user", "create", |args: StructValue| async move {
//!     let id = next_id();
//!     Ok(StructValue::new().with(1, id).into())
//! })?;
//! ```

use std::future::Future;

use async_trait::async_trait;
use iop_core::StructValue;

/// What a handler hands back on success.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerReply {
    /// Fields of the method's `out` struct.
    Struct(StructValue),
    /// Reply of a method without `out`.
    Void,
}

impl From<StructValue> for HandlerReply {
    fn from(value: StructValue) -> Self {
        Self::Struct(value)
    }
}

/// An application-level failure.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerFailure {
    /// Fields of the method's `throw` struct.
    Exception(StructValue),
    /// A failure with no declared shape.
    Error(String),
}

pub type HandlerResult = Result<HandlerReply, HandlerFailure>;

/// Implementation of a single interface method.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, args: StructValue) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(StructValue) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(&self, args: StructValue) -> HandlerResult {
        self(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iop_core::Value;

    struct Echo;

    #[async_trait]
    impl Handler for Echo {
        async fn call(&self, args: StructValue) -> HandlerResult {
            Ok(HandlerReply::Struct(args))
        }
    }

    #[tokio::test]
    async fn test_closure_is_handler() {
        let handler = |args: StructValue| async move {
            let name = args.value(1).and_then(Value::as_str).unwrap_or_default().len();
            Ok(StructValue::new().with(1, name as u32).into())
        };
        let reply = Handler::call(&handler, StructValue::new().with(1, "Alice")).await;
        assert_eq!(reply, Ok(HandlerReply::Struct(StructValue::new().with(1, 5u32))));
    }

    #[tokio::test]
    async fn test_trait_object_handler() {
        let handler: Box<dyn Handler> = Box::new(Echo);
        let args = StructValue::new().with(2, true);
        assert_eq!(handler.call(args.clone()).await, Ok(HandlerReply::Struct(args)));
    }

    #[tokio::test]
    async fn test_failure_is_returned() {
        let handler = |_args: StructValue| async move {
            Err(HandlerFailure::Error("no such user".to_string()))
        };
        assert_eq!(
            Handler::call(&handler, StructValue::new()).await,
            Err(HandlerFailure::Error("no such user".to_string()))
        );
    }
}
