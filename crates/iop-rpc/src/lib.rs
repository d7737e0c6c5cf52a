//! # iop-rpc — Module Registry and Interface Dispatcher
//!
//! Turns a resolved schema into a callable service:
//!
//! ```text
//! RegistryBuilder ──build()──▶ Registry ──▶ Dispatcher
//!   implement / mount            sealed        dispatch(module, member, method, payload)
//!   (checked against schema)     Arc-shared    dispatch_frame(request frame)
//! ```
//!
//! Dispatch never panics on client input. Every failure maps to one of
//! three outcomes, carried by [`RpcError`]:
//!
//! | kind          | cause                                             |
//! |---------------|---------------------------------------------------|
//! | `not_found`   | route unknown to the schema or without a handler  |
//! | `bad_request` | payload does not decode as the method's `Args`    |
//! | `app_error`   | handler failure, exception, or invalid reply      |
//!
//! ## Observability
//!
//! Each dispatch emits a `tracing` debug event with route, status and
//! elapsed time. When [`DispatchConfig::metrics_enabled`] is set it also
//! records `iop_dispatch_total` and `iop_dispatch_duration_seconds`
//! through the `metrics` facade.

pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod registry;

pub use config::DispatchConfig;
pub use dispatch::Dispatcher;
pub use envelope::{Request, Response, Status};
pub use error::{RegistryError, RpcError, RpcErrorKind};
pub use handler::{Handler, HandlerFailure, HandlerReply, HandlerResult};
pub use registry::{Binding, InterfaceImpl, Registry, RegistryBuilder};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use iop_schema::{load_tree_str, resolve, ResolvedSchema, TreeFormat};

    pub(crate) fn course_schema() -> Arc<ResolvedSchema> {
        let tree = load_tree_str(include_str!("../../../schemas/course.yaml"), TreeFormat::Yaml)
            .unwrap();
        Arc::new(resolve(&tree).unwrap())
    }
}
