//! The middleware unit contract.
//!
//! A [`Unit`] receives the request context, the request, and a [`Next`]
//! continuation. It may:
//!
//! 1. inspect or reject the request before delegating,
//! 2. call `next.run()` at most once (not calling it means the unit answers
//!    the request itself, e.g. a CORS preflight),
//! 3. rewrite the response on the way back out.
//!
//! Units are a closed set. Dispatch is a `match`, not a vtable.

use crate::context::RequestContext;
use crate::units::{
    AuthenticationUnit, CorsUnit, ErrorHandlingUnit, JsonUnit, LoggingUnit, RateLimitUnit,
};
use crate::chain::Stage;
use courier_core::{GatewayError, Request, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The result every unit and the terminal handler produce.
///
/// `Err` means a failure nobody inside the chain converted to a response yet;
/// the ErrorHandling unit turns it into an envelope.
pub type PipelineResult = Result<Response, GatewayError>;

/// The terminal handler at the end of the chain.
type TerminalHandler<'a> =
    Box<dyn FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, PipelineResult> + Send + 'a>;

/// One processing step of the chain.
#[derive(Debug)]
pub enum Unit {
    /// Converts escaped failures and panics into envelopes.
    ErrorHandling(ErrorHandlingUnit),
    /// Records request outcome and duration.
    Logging(LoggingUnit),
    /// Answers preflights and adds CORS headers.
    Cors(CorsUnit),
    /// Validates bearer tokens and attaches identity.
    Authentication(AuthenticationUnit),
    /// Enforces per-client request budgets.
    RateLimit(RateLimitUnit),
    /// Parses JSON requests and encodes structured responses.
    Json(JsonUnit),
}

impl Unit {
    /// Returns the stage this unit occupies.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::ErrorHandling(_) => Stage::ErrorHandling,
            Self::Logging(_) => Stage::Logging,
            Self::Cors(_) => Stage::Cors,
            Self::Authentication(_) => Stage::Authentication,
            Self::RateLimit(_) => Stage::RateLimit,
            Self::Json(_) => Stage::Json,
        }
    }

    /// Returns the unit name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.stage().name()
    }

    /// Processes the request through this unit.
    pub fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        match self {
            Self::ErrorHandling(unit) => unit.process(ctx, request, next),
            Self::Logging(unit) => unit.process(ctx, request, next),
            Self::Cors(unit) => unit.process(ctx, request, next),
            Self::Authentication(unit) => unit.process(ctx, request, next),
            Self::RateLimit(unit) => unit.process(ctx, request, next),
            Self::Json(unit) => unit.process(ctx, request, next),
        }
    }
}

impl From<ErrorHandlingUnit> for Unit {
    fn from(unit: ErrorHandlingUnit) -> Self {
        Self::ErrorHandling(unit)
    }
}

impl From<LoggingUnit> for Unit {
    fn from(unit: LoggingUnit) -> Self {
        Self::Logging(unit)
    }
}

impl From<CorsUnit> for Unit {
    fn from(unit: CorsUnit) -> Self {
        Self::Cors(unit)
    }
}

impl From<AuthenticationUnit> for Unit {
    fn from(unit: AuthenticationUnit) -> Self {
        Self::Authentication(unit)
    }
}

impl From<RateLimitUnit> for Unit {
    fn from(unit: RateLimitUnit) -> Self {
        Self::RateLimit(unit)
    }
}

impl From<JsonUnit> for Unit {
    fn from(unit: JsonUnit) -> Self {
        Self::Json(unit)
    }
}

/// Continuation to the rest of the chain.
///
/// Consumed by [`Next::run`], so a unit can call it at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    /// More units to process
    Chain { unit: &'a Unit, next: Box<Next<'a>> },
    /// End of chain - invoke the handler
    Handler(TerminalHandler<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke `unit`, then `next`.
    pub(crate) fn new(unit: &'a Unit, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                unit,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    ///
    /// The handler reads what it needs from the context synchronously; the
    /// future it returns owns everything it uses.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, PipelineResult> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next unit or the handler.
    pub async fn run(self, ctx: &mut RequestContext, request: Request) -> PipelineResult {
        match self.inner {
            NextInner::Chain { unit, next } => unit.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            NextInner::Chain { unit, .. } => f.debug_tuple("Next::Chain").field(&unit.name()).finish(),
            NextInner::Handler(_) => write!(f, "Next::Handler(<fn>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use courier_core::ResponseExt;
    use http::StatusCode;

    fn request() -> Request {
        http::Request::builder().uri("/test").body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn test_next_handler() {
        let mut ctx = RequestContext::new();
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(Response::empty(StatusCode::OK)) })
        });

        let response = next.run(&mut ctx, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let mut ctx = RequestContext::new();
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Err(GatewayError::internal("boom")) })
        });

        let err = next.run(&mut ctx, request()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_unit_chain_runs_through() {
        let json = Unit::from(JsonUnit::new());
        let logging = Unit::from(LoggingUnit::new());

        let mut ctx = RequestContext::new();
        let handler = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(Response::empty(StatusCode::ACCEPTED)) })
        });
        let next = Next::new(&logging, Next::new(&json, handler));

        let response = next.run(&mut ctx, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_unit_names_follow_stage() {
        assert_eq!(Unit::from(CorsUnit::new()).name(), "cors");
        assert_eq!(Unit::from(JsonUnit::new()).stage(), Stage::Json);
    }
}
