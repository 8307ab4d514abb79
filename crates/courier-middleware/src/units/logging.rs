//! Request logging unit.
//!
//! Records method, target and wall-clock duration of the remaining chain for
//! every request. Failures are logged and handed back unchanged, so the
//! ErrorHandling unit outside it still performs the translation.
//!
//! A request whose inner chain panics never returns here. Its in-flight
//! record is dropped during unwinding instead, which logs a
//! `request aborted` error carrying the same fields.
//!
//! The request id is echoed to the caller in the `x-request-id` header.

use crate::context::{RequestContext, REQUEST_ID_HEADER};
use crate::unit::{BoxFuture, Next, PipelineResult};
use courier_core::{Request, RequestId};
use http::{HeaderValue, Method};
use std::time::Instant;

/// Logs one event per request.
#[derive(Debug, Clone, Default)]
pub struct LoggingUnit {
    /// Whether to echo the request id in the response.
    echo_request_id: bool,
}

impl LoggingUnit {
    /// Creates a logging unit that echoes the request id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            echo_request_id: true,
        }
    }

    /// Sets whether the `x-request-id` response header is added.
    #[must_use]
    pub fn echo_request_id(mut self, echo: bool) -> Self {
        self.echo_request_id = echo;
        self
    }

    pub(crate) fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            // Clone request info before passing ownership
            let mut in_flight = InFlight {
                request_id: ctx.request_id(),
                method: request.method().clone(),
                target: request.uri().to_string(),
                start: Instant::now(),
                finished: false,
            };

            let result = next.run(ctx, request).await;

            let duration_ms = in_flight.finish();
            let InFlight {
                request_id,
                method,
                target,
                ..
            } = &in_flight;
            let client = ctx.identity().log_id();

            match result {
                Ok(mut response) => {
                    tracing::info!(
                        request_id = %request_id,
                        method = %method,
                        target = %target,
                        status = response.status().as_u16(),
                        duration_ms,
                        client = %client,
                        "request completed"
                    );

                    if self.echo_request_id {
                        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                            response.headers_mut().insert(REQUEST_ID_HEADER, value);
                        }
                    }
                    Ok(response)
                }
                Err(err) => {
                    tracing::error!(
                        request_id = %request_id,
                        method = %method,
                        target = %target,
                        duration_ms,
                        client = %client,
                        error = %err,
                        "request failed"
                    );
                    Err(err)
                }
            }
        })
    }
}

/// A request the unit has seen start but not yet finish.
struct InFlight {
    request_id: RequestId,
    method: Method,
    target: String,
    start: Instant,
    finished: bool,
}

impl InFlight {
    /// Marks the request finished and returns its duration in milliseconds.
    fn finish(&mut self) -> u64 {
        self.finished = true;
        self.duration_ms()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn duration_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.finished {
            tracing::error!(
                request_id = %self.request_id,
                method = %self.method,
                target = %self.target,
                duration_ms = self.duration_ms(),
                "request aborted before a response was produced"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Unit;
    use bytes::Bytes;
    use courier_core::{GatewayError, Response, ResponseExt};
    use http::StatusCode;

    fn request() -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/api/v1/command")
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_echoes_request_id() {
        let unit = Unit::from(LoggingUnit::new());
        let mut ctx = RequestContext::new();
        let expected = ctx.request_id().to_string();

        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(Response::empty(StatusCode::OK)) })
        });
        let response = unit.process(&mut ctx, request(), next).await.unwrap();

        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn test_echo_can_be_disabled() {
        let unit = Unit::from(LoggingUnit::new().echo_request_id(false));
        let mut ctx = RequestContext::new();

        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(Response::empty(StatusCode::OK)) })
        });
        let response = unit.process(&mut ctx, request(), next).await.unwrap();

        assert!(response.headers().get(REQUEST_ID_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_failure_is_returned_unchanged() {
        let unit = Unit::from(LoggingUnit::new());
        let mut ctx = RequestContext::new();

        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Err(GatewayError::not_found("Agent not found: a-1")) })
        });
        let err = unit.process(&mut ctx, request(), next).await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Agent not found: a-1");
    }

    mod capture {
        use std::fmt::{self, Write};
        use std::sync::{Arc, Mutex};
        use tracing::field::{Field, Visit};
        use tracing::{Event, Subscriber};
        use tracing_subscriber::layer::{Context, Layer};

        /// Records every event as `LEVEL field=value ...`.
        #[derive(Clone, Default)]
        pub struct Events(pub Arc<Mutex<Vec<String>>>);

        struct Line(String);

        impl Visit for Line {
            fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
                let _ = write!(self.0, " {}={:?}", field.name(), value);
            }
        }

        impl<S: Subscriber> Layer<S> for Events {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                let mut line = Line(event.metadata().level().to_string());
                event.record(&mut line);
                self.0.lock().unwrap().push(line.0);
            }
        }
    }

    #[tokio::test]
    async fn test_panic_is_logged_as_aborted() {
        use futures_util::FutureExt;
        use std::panic::AssertUnwindSafe;
        use tracing_subscriber::layer::SubscriberExt;

        fn explode() -> crate::unit::PipelineResult {
            panic!("handler bug")
        }

        let events = capture::Events::default();
        let subscriber = tracing_subscriber::registry().with(events.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let unit = Unit::from(LoggingUnit::new());
        let mut ctx = RequestContext::new();
        let request_id = ctx.request_id().to_string();
        let next = Next::handler(|_ctx, _req| Box::pin(async { explode() }));

        let outcome = AssertUnwindSafe(unit.process(&mut ctx, request(), next))
            .catch_unwind()
            .await;
        assert!(outcome.is_err());

        let lines = events.0.lock().unwrap();
        let aborted: Vec<_> = lines
            .iter()
            .filter(|line| line.contains("request aborted"))
            .collect();
        assert_eq!(aborted.len(), 1, "events: {lines:?}");
        assert!(aborted[0].starts_with("ERROR"));
        assert!(aborted[0].contains("method=POST"));
        assert!(aborted[0].contains("target=/api/v1/command"));
        assert!(aborted[0].contains(&request_id));
    }

    #[tokio::test]
    async fn test_completed_request_is_not_aborted() {
        use tracing_subscriber::layer::SubscriberExt;

        let events = capture::Events::default();
        let subscriber = tracing_subscriber::registry().with(events.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let unit = Unit::from(LoggingUnit::new());
        let mut ctx = RequestContext::new();
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(Response::empty(StatusCode::OK)) })
        });
        unit.process(&mut ctx, request(), next).await.unwrap();

        let lines = events.0.lock().unwrap();
        assert!(lines.iter().any(|line| line.contains("request completed")));
        assert!(!lines.iter().any(|line| line.contains("request aborted")));
    }
}
