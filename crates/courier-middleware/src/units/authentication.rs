//! Bearer token authentication unit.
//!
//! Health-check paths bypass the check entirely. For every other path the
//! `Authorization` header must read `Bearer <token>`. Token validation is a
//! stub: the literal token `invalid` is rejected and any other token yields a
//! synthetic user identity derived from its first 16 characters.
//!
//! A request without any `Authorization` header is rejected unless anonymous
//! access was switched on with [`AuthenticationUnit::allow_anonymous`].
//!
//! Rejections are answered here with a 401 envelope and a
//! `WWW-Authenticate: Bearer` header.

use crate::context::RequestContext;
use crate::unit::{BoxFuture, Next, PipelineResult};
use courier_core::{CallerIdentity, GatewayError, Request, Response};
use http::{header, HeaderValue};

/// Paths that never require a token.
pub const DEFAULT_HEALTH_PATHS: [&str; 2] = ["/health", "/api/v1/health"];

/// Token value the stub validator rejects.
const REJECTED_TOKEN: &str = "invalid";

/// Number of token characters used to build the synthetic user id.
const USER_ID_TOKEN_CHARS: usize = 16;

/// Validates bearer tokens and attaches the caller identity.
///
/// # Example
///
/// ```
/// use courier_middleware::units::AuthenticationUnit;
///
/// let auth = AuthenticationUnit::new().health_path("/healthz");
/// assert!(auth.is_health_path("/healthz"));
/// assert!(auth.is_health_path("/api/v1/health"));
/// assert!(!auth.allows_anonymous());
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticationUnit {
    health_paths: Vec<String>,
    allow_anonymous: bool,
}

impl Default for AuthenticationUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticationUnit {
    /// Creates a unit that requires a token on every non-health path.
    #[must_use]
    pub fn new() -> Self {
        Self {
            health_paths: DEFAULT_HEALTH_PATHS.map(String::from).to_vec(),
            allow_anonymous: false,
        }
    }

    /// Lets requests without an `Authorization` header through as anonymous.
    #[must_use]
    pub fn allow_anonymous(mut self, allow: bool) -> Self {
        self.allow_anonymous = allow;
        self
    }

    /// Adds a path that bypasses authentication.
    #[must_use]
    pub fn health_path(mut self, path: impl Into<String>) -> Self {
        self.health_paths.push(path.into());
        self
    }

    /// Replaces the set of paths that bypass authentication.
    #[must_use]
    pub fn health_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.health_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Returns whether anonymous requests are let through.
    #[must_use]
    pub fn allows_anonymous(&self) -> bool {
        self.allow_anonymous
    }

    /// Returns `true` if `path` bypasses authentication.
    #[must_use]
    pub fn is_health_path(&self, path: &str) -> bool {
        self.health_paths.iter().any(|p| p == path)
    }

    /// Resolves the caller identity from the `Authorization` header.
    ///
    /// `Ok(None)` means no header was sent.
    fn authenticate(request: &Request) -> Result<Option<CallerIdentity>, GatewayError> {
        let Some(value) = request.headers().get(header::AUTHORIZATION) else {
            return Ok(None);
        };

        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::authentication("Invalid Authorization header format"))?;

        if token == REJECTED_TOKEN {
            return Err(GatewayError::authentication("Invalid token"));
        }

        let prefix: String = token.chars().take(USER_ID_TOKEN_CHARS).collect();
        Ok(Some(CallerIdentity::user(format!("token:{prefix}"))))
    }

    fn reject(err: GatewayError) -> Response {
        let mut response = err.into_response();
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }

    pub(crate) fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            if self.is_health_path(request.uri().path()) {
                return next.run(ctx, request).await;
            }

            match Self::authenticate(&request) {
                Ok(Some(identity)) => ctx.set_identity(identity),
                Ok(None) if self.allow_anonymous => {}
                Ok(None) => {
                    return Ok(Self::reject(GatewayError::authentication(
                        "Missing Authorization header",
                    )));
                }
                Err(err) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        error = %err,
                        "authentication rejected"
                    );
                    return Ok(Self::reject(err));
                }
            }

            next.run(ctx, request).await
        })
    }
}
