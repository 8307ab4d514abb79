//! Ordered middleware chain.
//!
//! The chain is built once at startup. [`ChainBuilder::build`] checks that
//! units appear in [`Stage`] order with no duplicates; units may be omitted
//! (e.g. rate limiting disabled by configuration) but never reordered.

use crate::context::RequestContext;
use crate::unit::{BoxFuture, Next, PipelineResult, Unit};
use crate::units::{
    AuthenticationUnit, CorsUnit, ErrorHandlingUnit, JsonUnit, LoggingUnit, RateLimitUnit,
};
use courier_core::{Request, Response};
use thiserror::Error;

/// Position of a unit in the chain, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: catches everything escaping the inner stages
    ErrorHandling = 1,
    /// Stage 2: request/response logging
    Logging = 2,
    /// Stage 3: CORS preflight and headers
    Cors = 3,
    /// Stage 4: bearer token authentication
    Authentication = 4,
    /// Stage 5: per-client rate limiting
    RateLimit = 5,
    /// Stage 6: JSON request parsing and response encoding
    Json = 6,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ErrorHandling => "error_handling",
            Self::Logging => "logging",
            Self::Cors => "cors",
            Self::Authentication => "authentication",
            Self::RateLimit => "rate_limit",
            Self::Json => "json",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 6] {
        [
            Self::ErrorHandling,
            Self::Logging,
            Self::Cors,
            Self::Authentication,
            Self::RateLimit,
            Self::Json,
        ]
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors detected while assembling a chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainBuildError {
    /// The same stage was added twice.
    #[error("duplicate middleware stage: {0}")]
    Duplicate(Stage),

    /// A stage was added after a stage that must come later.
    #[error("middleware stage {stage} must come before {after}")]
    OutOfOrder {
        /// The misplaced stage.
        stage: Stage,
        /// The stage it was placed after.
        after: Stage,
    },
}

/// The assembled middleware chain.
///
/// # Example
///
/// ```
/// use courier_middleware::{Chain, Stage};
/// use courier_middleware::units::{CorsUnit, JsonUnit};
///
/// let chain = Chain::builder()
///     .unit(CorsUnit::new())
///     .unit(JsonUnit::new())
///     .build()
///     .unwrap();
/// assert_eq!(chain.stages(), vec![Stage::Cors, Stage::Json]);
///
/// let err = Chain::builder()
///     .unit(JsonUnit::new())
///     .unit(CorsUnit::new())
///     .build()
///     .unwrap_err();
/// assert_eq!(err.to_string(), "middleware stage cors must come before json");
/// ```
#[derive(Debug)]
pub struct Chain {
    units: Vec<Unit>,
}

impl Chain {
    /// Creates a new chain builder.
    #[must_use]
    pub fn builder() -> ChainBuilder {
        ChainBuilder::new()
    }

    /// Creates the full six-stage chain with default unit settings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            units: vec![
                ErrorHandlingUnit::new().into(),
                LoggingUnit::new().into(),
                CorsUnit::new().into(),
                AuthenticationUnit::new().into(),
                RateLimitUnit::builder().build().into(),
                JsonUnit::new().into(),
            ],
        }
    }

    /// Runs a request through every unit and then `handler`.
    ///
    /// Returns `Err` only when the chain has no ErrorHandling unit and a
    /// failure escaped; see [`Chain::handle`] for the always-a-response form.
    pub async fn process<H>(
        &self,
        ctx: &mut RequestContext,
        request: Request,
        handler: H,
    ) -> PipelineResult
    where
        H: FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, PipelineResult> + Send,
    {
        // Build the chain from back to front
        let mut next = Next::handler(handler);
        for unit in self.units.iter().rev() {
            next = Next::new(unit, next);
        }
        next.run(ctx, request).await
    }

    /// Runs a request through the chain, always producing a response.
    pub async fn handle<H>(&self, ctx: &mut RequestContext, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, PipelineResult> + Send,
    {
        match self.process(ctx, request, handler).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    /// Returns the stages present, in order.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        self.units.iter().map(Unit::stage).collect()
    }

    /// Returns the names of all units in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.units.iter().map(Unit::name).collect()
    }

    /// Returns the number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` if the chain has no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Builder for constructing a [`Chain`].
#[derive(Debug, Default)]
pub struct ChainBuilder {
    units: Vec<Unit>,
}

impl ChainBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a unit. Order is checked by [`ChainBuilder::build`].
    #[must_use]
    pub fn unit(mut self, unit: impl Into<Unit>) -> Self {
        self.units.push(unit.into());
        self
    }

    /// Appends a unit when present.
    #[must_use]
    pub fn maybe_unit(self, unit: Option<impl Into<Unit>>) -> Self {
        match unit {
            Some(unit) => self.unit(unit),
            None => self,
        }
    }

    /// Validates stage order and builds the chain.
    pub fn build(self) -> Result<Chain, ChainBuildError> {
        for pair in self.units.windows(2) {
            let (previous, current) = (pair[0].stage(), pair[1].stage());
            if previous == current {
                return Err(ChainBuildError::Duplicate(current));
            }
            if previous > current {
                return Err(ChainBuildError::OutOfOrder {
                    stage: current,
                    after: previous,
                });
            }
        }
        Ok(Chain { units: self.units })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use courier_core::{GatewayError, ResponseExt};
    use http::StatusCode;

    fn request() -> Request {
        http::Request::builder().uri("/test").body(Bytes::new()).unwrap()
    }

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::ErrorHandling < Stage::Logging);
        assert!(Stage::Logging < Stage::Cors);
        assert!(Stage::Cors < Stage::Authentication);
        assert!(Stage::Authentication < Stage::RateLimit);
        assert!(Stage::RateLimit < Stage::Json);
    }

    #[test]
    fn test_default_chain_has_every_stage_in_order() {
        let chain = Chain::with_defaults();
        assert_eq!(chain.len(), 6);
        assert_eq!(
            chain.stage_names(),
            vec!["error_handling", "logging", "cors", "authentication", "rate_limit", "json"]
        );
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let err = Chain::builder()
            .unit(JsonUnit::new())
            .unit(JsonUnit::new())
            .build()
            .unwrap_err();
        assert_eq!(err, ChainBuildError::Duplicate(Stage::Json));
    }

    #[test]
    fn test_out_of_order_rejected() {
        let err = Chain::builder()
            .unit(LoggingUnit::new())
            .unit(ErrorHandlingUnit::new())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ChainBuildError::OutOfOrder {
                stage: Stage::ErrorHandling,
                after: Stage::Logging
            }
        );
    }

    #[test]
    fn test_omitted_stage_allowed() {
        let chain = Chain::builder()
            .unit(ErrorHandlingUnit::new())
            .maybe_unit(None::<RateLimitUnit>)
            .unit(JsonUnit::new())
            .build()
            .unwrap();
        assert_eq!(chain.stages(), vec![Stage::ErrorHandling, Stage::Json]);
    }

    #[tokio::test]
    async fn test_empty_chain_reaches_handler() {
        let chain = Chain::builder().build().unwrap();
        assert!(chain.is_empty());

        let mut ctx = RequestContext::new();
        let response = chain
            .handle(&mut ctx, request(), |_ctx, _req| {
                Box::pin(async { Ok(Response::empty(StatusCode::NO_CONTENT)) })
            })
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_handle_converts_escaped_error() {
        let chain = Chain::builder().unit(JsonUnit::new()).build().unwrap();

        let mut ctx = RequestContext::new();
        let response = chain
            .handle(&mut ctx, request(), |_ctx, _req| {
                Box::pin(async { Err(GatewayError::not_found("gone")) })
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
