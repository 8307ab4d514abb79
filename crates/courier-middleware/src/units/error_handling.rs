//! Error handling unit.
//!
//! The outermost unit. Whatever escapes the inner chain, an `Err` result or a
//! panic, is converted here exactly once into a JSON envelope with the status
//! matching its [`ErrorKind`](courier_core::ErrorKind). Headers that outer
//! units recorded with [`RequestContext::add_failure_headers`] are attached to
//! that envelope.
//!
//! ```text
//! [ErrorHandling] → Logging → CORS → Authentication → RateLimit → JSON → Router
//! ```
//!
//! # Example
//!
//! ```
//! use courier_middleware::units::ErrorHandlingUnit;
//!
//! // Development: surface internal error messages to callers
//! let unit = ErrorHandlingUnit::new().expose_internal_errors(true);
//! assert!(unit.exposes_internal_errors());
//! ```

use crate::context::RequestContext;
use crate::unit::{BoxFuture, Next, PipelineResult};
use courier_core::{Envelope, ErrorKind, GatewayError, Request, Response, ResponseExt};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

/// Message returned for internal failures unless exposure is enabled.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Converts failures escaping the chain into envelopes.
#[derive(Debug, Clone, Default)]
pub struct ErrorHandlingUnit {
    /// Whether internal error messages reach the caller.
    expose_internal_errors: bool,
}

impl ErrorHandlingUnit {
    /// Creates an error handling unit that hides internal error messages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to expose internal error messages.
    ///
    /// **Warning**: Only enable this in development environments.
    #[must_use]
    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Returns whether internal error messages are exposed.
    #[must_use]
    pub fn exposes_internal_errors(&self) -> bool {
        self.expose_internal_errors
    }

    fn error_response(&self, err: GatewayError) -> Response {
        if err.kind() == ErrorKind::Internal && !self.expose_internal_errors {
            return Response::envelope(
                ErrorKind::Internal.status_code(),
                &Envelope::error(INTERNAL_ERROR_MESSAGE),
            );
        }
        err.into_response()
    }

    fn panic_response(&self, payload: &(dyn Any + Send)) -> Response {
        let message = panic_message(payload);
        tracing::error!(panic = %message, "request handler panicked");

        let err = GatewayError::internal(message);
        self.error_response(err)
    }

    pub(crate) fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            let request_id = ctx.request_id();
            let outcome = AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await;

            let mut response = match outcome {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(err)) => {
                    tracing::debug!(
                        request_id = %request_id,
                        kind = ?err.kind(),
                        error = %err,
                        "converting escaped error"
                    );
                    self.error_response(err)
                }
                Err(payload) => self.panic_response(payload.as_ref()),
            };

            // Units that never saw the response still owe it their headers
            let headers = response.headers_mut();
            for (name, value) in ctx.take_failure_headers() {
                if let Some(name) = name {
                    if !headers.contains_key(&name) {
                        headers.insert(name, value);
                    }
                }
            }

            Ok(response)
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
