//! HTTP endpoints in front of the command router.
//!
//! | Method     | Path                              | Action                    |
//! |------------|-----------------------------------|---------------------------|
//! | GET, POST  | `auth.health_paths`               | liveness payload          |
//! | POST       | `/api/v1/command`                 | `{command, params}`       |
//! | POST       | `/api/v1/{module}/{function}`     | body is the params object |
//! | any        | anything else                     | 404                       |
//!
//! Every request runs through the middleware [`Chain`] first; the endpoint
//! is the chain's terminal handler. The health paths default to `/health` and
//! `/api/v1/health`; the same list lets them past authentication.

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use courier_config::CourierConfig;
use courier_core::{
    Body, Envelope, ErrorKind, GatewayError, GatewayResult, Request, Response, ResponseExt,
    APPLICATION_JSON,
};
use courier_middleware::units::authentication::DEFAULT_HEALTH_PATHS;
use courier_middleware::units::{
    AuthenticationUnit, CorsUnit, ErrorHandlingUnit, JsonUnit, LoggingUnit, RateLimitUnit,
};
use courier_middleware::{BoxFuture, Chain, ChainBuildError, PipelineResult, RequestContext};
use courier_router::{CommandRouter, Params};
use http::{header, HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use serde_json::Value;

use crate::error::ServerError;
use crate::health::HealthCheck;

/// Path of the command endpoint.
pub const COMMAND_PATH: &str = "/api/v1/command";

/// Prefix of the `/{module}/{function}` endpoints.
pub const API_PREFIX: &str = "/api/v1/";

/// The HTTP response handed to hyper.
pub type HttpResponse = http::Response<Full<Bytes>>;

/// Assembles the middleware chain described by `config`.
///
/// The rate limit stage is omitted when `rate_limit.enabled` is false.
pub fn build_chain(config: &CourierConfig) -> Result<Chain, ChainBuildError> {
    let cors = CorsUnit::builder()
        .allow_origins(config.cors.allowed_origins.iter().cloned())
        .allow_methods(config.cors.allowed_methods.iter().cloned())
        .allow_headers(config.cors.allowed_headers.iter().cloned())
        .max_age(config.cors.max_age_secs.map(Duration::from_secs))
        .build();

    let authentication = AuthenticationUnit::new()
        .allow_anonymous(config.auth.allow_anonymous)
        .health_paths(config.auth.health_paths.iter().cloned());

    let rate_limit = config.rate_limit.enabled.then(|| {
        RateLimitUnit::builder()
            .limit(config.rate_limit.limit)
            .window_secs(config.rate_limit.window_seconds)
            .build()
    });

    Chain::builder()
        .unit(ErrorHandlingUnit::new().expose_internal_errors(config.error_handling.expose_internal_errors))
        .unit(LoggingUnit::new())
        .unit(cors)
        .unit(authentication)
        .maybe_unit(rate_limit)
        .unit(JsonUnit::new())
        .build()
}

/// The gateway: middleware chain plus endpoints.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use courier_config::CourierConfig;
/// use courier_router::{agents::InMemoryAgents, CommandRouter};
/// use courier_server::Gateway;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let router = Arc::new(CommandRouter::standard(Arc::new(InMemoryAgents::new())).unwrap());
/// let gateway = Gateway::from_config(&CourierConfig::default(), router).unwrap();
///
/// let request = http::Request::get("/health").body(Bytes::new()).unwrap();
/// let response = gateway.handle(request, None).await;
/// assert_eq!(response.status(), http::StatusCode::OK);
/// # });
/// ```
#[derive(Debug)]
pub struct Gateway {
    chain: Chain,
    router: Arc<CommandRouter>,
    health: Arc<HealthCheck>,
    health_paths: Arc<[String]>,
    max_body_bytes: usize,
}

impl Gateway {
    /// Creates a gateway from its parts.
    #[must_use]
    pub fn new(chain: Chain, router: Arc<CommandRouter>, health: HealthCheck, max_body_bytes: usize) -> Self {
        Self {
            chain,
            router,
            health: Arc::new(health),
            health_paths: DEFAULT_HEALTH_PATHS.map(String::from).to_vec().into(),
            max_body_bytes,
        }
    }

    /// Replaces the paths answered with the health payload.
    #[must_use]
    pub fn with_health_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.health_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Creates a gateway with the chain and limits described by `config`.
    pub fn from_config(config: &CourierConfig, router: Arc<CommandRouter>) -> Result<Self, ServerError> {
        config.validate()?;
        let chain = build_chain(config)?;

        if config.auth.allow_anonymous {
            tracing::warn!("anonymous access is enabled; requests without credentials are accepted");
        }
        tracing::debug!(stages = ?chain.stage_names(), "middleware chain assembled");

        let health = HealthCheck::new(config.logging.service_name.clone(), env!("CARGO_PKG_VERSION"));
        Ok(Self::new(chain, router, health, config.server.max_body_bytes)
            .with_health_paths(config.auth.health_paths.iter().cloned()))
    }

    /// Returns the middleware chain.
    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Returns the command router.
    #[must_use]
    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }

    /// Returns the paths answered with the health payload.
    #[must_use]
    pub fn health_paths(&self) -> &[String] {
        &self.health_paths
    }

    /// Returns the request body limit.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Runs a collected request through the chain and endpoints.
    pub async fn handle(&self, request: Request, remote_addr: Option<SocketAddr>) -> Response {
        let mut ctx = RequestContext::for_request(&request, remote_addr);
        let router = Arc::clone(&self.router);
        let health = Arc::clone(&self.health);
        let health_paths = Arc::clone(&self.health_paths);

        self.chain
            .handle(&mut ctx, request, move |ctx, request| {
                let route = Route::resolve(request.method(), request.uri().path(), &health_paths);
                endpoint(ctx, request, route, router, health)
            })
            .await
    }

    /// Collects a streaming body under the size limit, then handles it.
    ///
    /// Bodies over the limit are answered with 413 without entering the
    /// chain.
    pub async fn serve<B>(&self, request: http::Request<B>, remote_addr: Option<SocketAddr>) -> HttpResponse
    where
        B: hyper::body::Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let (parts, body) = request.into_parts();

        let bytes = match Limited::new(body, self.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::warn!(
                    method = %parts.method,
                    target = %parts.uri,
                    limit = self.max_body_bytes,
                    "request body too large"
                );
                return into_http(Response::envelope(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    &Envelope::error(format!(
                        "Request body exceeds {} bytes",
                        self.max_body_bytes
                    )),
                ));
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read request body");
                return into_http(
                    GatewayError::parse(format!("Failed to read request body: {e}")).into_response(),
                );
            }
        };

        let request = http::Request::from_parts(parts, bytes);
        into_http(self.handle(request, remote_addr).await)
    }
}

/// Converts a chain response into a hyper response.
///
/// Structured bodies left unencoded (no JSON stage) are encoded here.
pub fn into_http(response: Response) -> HttpResponse {
    let (mut parts, body) = response.into_parts();
    if matches!(body, Body::Json(_)) && !parts.headers.contains_key(header::CONTENT_TYPE) {
        parts
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    }
    http::Response::from_parts(parts, Full::new(body.into_bytes()))
}

/// Endpoint selected for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Health,
    Command,
    Function(String),
    NotFound,
}

impl Route {
    fn resolve(method: &Method, path: &str, health_paths: &[String]) -> Self {
        let health = health_paths.iter().any(|p| p == path);
        match (method, path) {
            (&Method::GET | &Method::POST, _) if health => Self::Health,
            (&Method::POST, COMMAND_PATH) => Self::Command,
            (&Method::POST, _) => path
                .strip_prefix(API_PREFIX)
                .and_then(|rest| rest.split_once('/'))
                .filter(|(module, function)| {
                    !module.is_empty() && !function.is_empty() && !function.contains('/')
                })
                .map_or(Self::NotFound, |(module, function)| {
                    Self::Function(format!("{module}.{function}"))
                }),
            _ => Self::NotFound,
        }
    }
}

// The terminal handler: reads what it needs from the context, then runs
// detached from it.
fn endpoint(
    ctx: &mut RequestContext,
    request: Request,
    route: Route,
    router: Arc<CommandRouter>,
    health: Arc<HealthCheck>,
) -> BoxFuture<'static, PipelineResult> {
    let parsed = ctx.json_body().cloned();
    let not_found = format!("Not found: {} {}", request.method(), request.uri().path());
    let raw = request.into_body();

    Box::pin(async move {
        match route {
            Route::Health => {
                let status = serde_json::to_value(health.status())
                    .map_err(|e| GatewayError::internal(format!("Failed to encode health: {e}")))?;
                Ok(Response::structured(StatusCode::OK, status))
            }
            Route::Command => {
                let result = async {
                    let body = request_json(parsed, &raw)?.unwrap_or(Value::Null);
                    let command = body
                        .get("command")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            GatewayError::validation("Request body must include a string 'command'")
                        })?
                        .to_string();
                    let params = Params::from_value(body.get("params").cloned().unwrap_or(Value::Null))?;
                    router.execute(&command, params).await
                }
                .await;
                respond(result)
            }
            Route::Function(command) => {
                let result = async {
                    let body = request_json(parsed, &raw)?.unwrap_or(Value::Null);
                    router.execute(&command, Params::from_value(body)?).await
                }
                .await;
                respond(result)
            }
            Route::NotFound => Ok(Response::structured(
                StatusCode::NOT_FOUND,
                Envelope::error(not_found).to_value(),
            )),
        }
    })
}

/// Returns the body parsed by the JSON stage, or parses it here when the
/// request did not declare a JSON content type.
fn request_json(parsed: Option<Value>, raw: &Bytes) -> GatewayResult<Option<Value>> {
    if parsed.is_some() {
        return Ok(parsed);
    }
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(raw)
        .map(Some)
        .map_err(|e| GatewayError::parse(format!("Invalid JSON in request body: {e}")))
}

/// Maps a dispatch outcome onto a response.
///
/// Internal failures propagate so the ErrorHandling stage can hide them.
fn respond(result: GatewayResult<Value>) -> PipelineResult {
    match result {
        Ok(data) => Ok(Response::structured(StatusCode::OK, Envelope::ok(data).to_value())),
        Err(err) if err.kind() == ErrorKind::Internal => Err(err),
        Err(err) => Ok(Response::structured(err.status_code(), err.to_envelope().to_value())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_middleware::Stage;
    use serde_json::json;

    fn resolve(method: &Method, path: &str) -> Route {
        let health_paths = DEFAULT_HEALTH_PATHS.map(String::from);
        Route::resolve(method, path, &health_paths)
    }

    #[test]
    fn test_route_resolution() {
        assert_eq!(resolve(&Method::GET, "/health"), Route::Health);
        assert_eq!(resolve(&Method::POST, "/api/v1/health"), Route::Health);
        assert_eq!(resolve(&Method::POST, "/api/v1/command"), Route::Command);
        assert_eq!(
            resolve(&Method::POST, "/api/v1/agents/list_agents"),
            Route::Function("agents.list_agents".to_string())
        );
        assert_eq!(resolve(&Method::GET, "/api/v1/command"), Route::NotFound);
        assert_eq!(resolve(&Method::POST, "/api/v1/agents"), Route::NotFound);
        assert_eq!(resolve(&Method::POST, "/api/v1/agents/"), Route::NotFound);
        assert_eq!(resolve(&Method::POST, "/api/v1/a/b/c"), Route::NotFound);
        assert_eq!(resolve(&Method::DELETE, "/health"), Route::NotFound);
    }

    #[test]
    fn test_health_route_follows_configured_paths() {
        let paths = vec!["/healthz".to_string()];
        assert_eq!(Route::resolve(&Method::GET, "/healthz", &paths), Route::Health);
        assert_eq!(Route::resolve(&Method::GET, "/health", &paths), Route::NotFound);
        assert_eq!(Route::resolve(&Method::GET, "/healthz", &[]), Route::NotFound);
    }

    #[test]
    fn test_build_chain_from_config() {
        let chain = build_chain(&CourierConfig::default()).unwrap();
        assert_eq!(chain.stages(), Stage::all().to_vec());

        let mut config = CourierConfig::default();
        config.rate_limit.enabled = false;
        let chain = build_chain(&config).unwrap();
        assert!(!chain.stages().contains(&Stage::RateLimit));
        assert_eq!(chain.len(), 5);
    }

    #[test]
    fn test_request_json() {
        assert_eq!(request_json(None, &Bytes::from_static(b"  \n")).unwrap(), None);
        assert_eq!(
            request_json(None, &Bytes::from_static(br#"{"a":1}"#)).unwrap(),
            Some(json!({"a": 1}))
        );
        assert_eq!(
            request_json(Some(json!({"b": 2})), &Bytes::from_static(b"ignored")).unwrap(),
            Some(json!({"b": 2}))
        );
        let err = request_json(None, &Bytes::from_static(b"{oops")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_respond_status_by_kind() {
        let response = respond(Err(GatewayError::not_implemented("Dex commands not implemented yet"))).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(
            response.body().as_json().unwrap(),
            &json!({"success": false, "error": "Dex commands not implemented yet"})
        );

        let err = respond(Err(GatewayError::internal("boom"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_into_http_sets_content_type() {
        let response = into_http(Response::structured(StatusCode::OK, json!({"a": 1})));
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            APPLICATION_JSON
        );
    }
}
