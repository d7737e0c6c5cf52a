//! # Interface Dispatcher
//!
//! Routes `(module, member, method, payload)` to the bound handler:
//!
//! 1. Look the route up in the sealed [`Registry`]. Unknown or unbound
//!    routes answer `NotFound` without touching the payload.
//! 2. Decode the payload against the method's `Args` struct. A decode
//!    failure answers `BadRequest`; the handler is not called.
//! 3. Await the handler.
//! 4. Encode its reply against `Res` (a `void` method answers with an empty
//!    payload) or its exception against `Exn`.
//!
//! The dispatcher holds no lock and owns no mutable state, so a caller may
//! drop a pending dispatch at any point.

use std::sync::Arc;
use std::time::{Duration, Instant};

use iop_codec::{decode_struct, encode_struct};
use iop_core::StructValue;

use crate::config::DispatchConfig;
use crate::envelope::{Request, Response, Status};
use crate::error::RpcError;
use crate::handler::{Handler, HandlerFailure, HandlerReply};
use crate::registry::{Binding, Registry};

/// Label value used for routes the registry does not know.
const UNROUTED: &str = "unrouted";

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, config: DispatchConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Dispatch one call. `Ok` carries the encoded reply.
    pub async fn dispatch(
        &self,
        module: &str,
        member: &str,
        method: &str,
        payload: &[u8],
    ) -> Result<Vec<u8>, RpcError> {
        let started = Instant::now();
        let binding = self.registry.lookup(module, member, method);
        let result = match binding {
            Some(binding) => self.invoke(binding, module, member, payload).await,
            None => Err(self.not_found(module, member, method)),
        };

        let status = match &result {
            Ok(_) => Status::Ok.as_str(),
            Err(err) => err.kind.as_str(),
        };
        let elapsed = started.elapsed();
        tracing::debug!(
            module = module,
            member = member,
            method = method,
            status,
            elapsed_us = elapsed.as_micros() as u64,
            "dispatch"
        );
        if self.config.metrics_enabled {
            match binding {
                Some(_) => record_dispatch(module, member, method, status, elapsed),
                None => record_dispatch(UNROUTED, UNROUTED, UNROUTED, status, elapsed),
            }
        }
        result
    }

    /// Dispatch a request frame and answer with a response frame.
    ///
    /// Always produces a frame: a request frame that does not decode is
    /// answered with `bad_request`.
    pub async fn dispatch_frame(&self, frame: &[u8]) -> Vec<u8> {
        let response = match Request::decode(frame) {
            Ok(req) => {
                let result = self
                    .dispatch(&req.module, &req.member, &req.method, &req.payload)
                    .await;
                Response::from(result)
            }
            Err(err) => {
                tracing::warn!(error = %err, "malformed request frame");
                Response::from(Err(RpcError::bad_request(err.to_string())))
            }
        };
        response.encode().unwrap_or_else(|err| {
            tracing::error!(error = %err, "response does not fit in a frame");
            let fallback = Response {
                status: Status::AppError,
                payload: Vec::new(),
            };
            fallback.encode().unwrap_or_default()
        })
    }

    /// Typed call through the request frame path.
    ///
    /// Encodes `args` against the method's `Args` struct, dispatches the
    /// frame and decodes the reply against `Res`. A declared exception comes
    /// back as an `AppError` whose payload is the encoded `Exn` struct.
    pub async fn call(
        &self,
        module: &str,
        member: &str,
        method: &str,
        args: &StructValue,
    ) -> Result<HandlerReply, RpcError> {
        let schema = self.registry.schema();
        let Some(route) = schema.route(module, member, method) else {
            return Err(self.not_found(module, member, method));
        };
        let payload = encode_struct(schema, route.args, args)
            .map_err(|err| RpcError::bad_request(err.to_string()))?;
        let frame = Request::new(module, member, method, payload)
            .encode()
            .map_err(|err| RpcError::bad_request(err.to_string()))?;

        let reply = self.dispatch_frame(&frame).await;
        let bytes = Response::decode(&reply)
            .map_err(|err| RpcError::app_error(err.to_string()))?
            .into_result()?;
        match route.res {
            Some(id) => decode_struct(schema, id, &bytes, &self.config.limits)
                .map(HandlerReply::Struct)
                .map_err(|err| RpcError::app_error(err.to_string())),
            None => Ok(HandlerReply::Void),
        }
    }

    fn not_found(&self, module: &str, member: &str, method: &str) -> RpcError {
        let declared = self.registry.schema().route(module, member, method).is_some();
        let route = format!("{module}.{member}.{method}");
        if declared {
            tracing::warn!(route = %route, "no handler bound");
            RpcError::not_found(format!("{route} has no handler"))
        } else {
            tracing::warn!(route = %route, "unknown route");
            RpcError::not_found(format!("{route} does not exist"))
        }
    }

    async fn invoke(
        &self,
        binding: &Binding,
        module: &str,
        member: &str,
        payload: &[u8],
    ) -> Result<Vec<u8>, RpcError> {
        let schema = self.registry.schema();
        let method = &binding.method;
        let route = format!("{module}.{member}.{}", method.name);

        let args = decode_struct(schema, method.args, payload, &self.config.limits).map_err(|err| {
            tracing::warn!(route = %route, error = %err, "request payload rejected");
            RpcError::bad_request(err.to_string())
        })?;

        match Handler::call(binding.handler.as_ref(), args).await {
            Ok(HandlerReply::Struct(reply)) => match method.res {
                Some(id) => encode_struct(schema, id, &reply)
                    .map_err(|err| reply_mismatch(&route, &err.to_string())),
                None => Err(reply_mismatch(&route, "void method replied with a value")),
            },
            Ok(HandlerReply::Void) => match method.res {
                Some(_) => Err(reply_mismatch(&route, "handler replied void")),
                None => Ok(Vec::new()),
            },
            Err(HandlerFailure::Exception(exn)) => match method.exn {
                Some(id) => match encode_struct(schema, id, &exn) {
                    Ok(bytes) => Err(RpcError::exception(bytes)),
                    Err(err) => Err(reply_mismatch(&route, &err.to_string())),
                },
                None => Err(reply_mismatch(&route, "method declares no exception")),
            },
            Err(HandlerFailure::Error(message)) => Err(RpcError::app_error(message)),
        }
    }
}

fn reply_mismatch(route: &str, reason: &str) -> RpcError {
    tracing::error!(route, reason, "handler reply does not match its declared type");
    RpcError::app_error(format!("{route}: invalid handler reply"))
}

fn record_dispatch(
    module: &str,
    member: &str,
    method: &str,
    status: &'static str,
    elapsed: Duration,
) {
    metrics::counter!(
        "iop_dispatch_total",
        "module" => module.to_string(),
        "member" => member.to_string(),
        "method" => method.to_string(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "iop_dispatch_duration_seconds",
        "module" => module.to_string(),
        "member" => member.to_string(),
        "method" => method.to_string()
    )
    .record(elapsed.as_secs_f64());
}
