//! CORS (Cross-Origin Resource Sharing) unit.
//!
//! Every `OPTIONS` request is treated as a preflight and answered here with
//! `200 OK` and the configured `Access-Control-*` headers; the rest of the
//! chain never sees it. Any other request is delegated and the outgoing
//! response gains `Access-Control-Allow-Origin`.
//!
//! ## Example
//!
//! ```
//! use courier_middleware::units::CorsUnit;
//! use std::time::Duration;
//!
//! let cors = CorsUnit::builder()
//!     .allow_origin("https://app.example.com")
//!     .allow_methods(["GET", "POST"])
//!     .max_age(Duration::from_secs(600))
//!     .build();
//! assert_eq!(cors.allowed_methods(), "GET, POST");
//! ```

use crate::context::RequestContext;
use crate::unit::{BoxFuture, Next, PipelineResult};
use courier_core::{Request, Response, ResponseExt};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use std::collections::BTreeSet;
use std::time::Duration;

/// CORS header names.
pub mod headers {
    /// `Access-Control-Allow-Origin` header.
    pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
    /// `Access-Control-Allow-Methods` header.
    pub const ALLOW_METHODS: &str = "access-control-allow-methods";
    /// `Access-Control-Allow-Headers` header.
    pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
    /// `Access-Control-Max-Age` header.
    pub const MAX_AGE: &str = "access-control-max-age";
    /// `Origin` header.
    pub const ORIGIN: &str = "origin";
    /// `Vary` header.
    pub const VARY: &str = "vary";
}

/// Represents the set of allowed origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Allow any origin (wildcard `*`).
    Any,
    /// Allow specific origins, echoed back when matched.
    List(BTreeSet<String>),
}

impl AllowedOrigins {
    /// Checks if an origin is allowed.
    pub fn is_allowed(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::List(origins) => origins.contains(origin),
        }
    }

    /// Returns the `Access-Control-Allow-Origin` value for a request origin.
    pub fn header_value(&self, origin: Option<&str>) -> Option<HeaderValue> {
        match self {
            Self::Any => Some(HeaderValue::from_static("*")),
            Self::List(origins) => origin
                .filter(|o| origins.contains(*o))
                .and_then(|o| HeaderValue::from_str(o).ok()),
        }
    }
}

/// Answers preflights and tags responses with CORS headers.
#[derive(Debug, Clone)]
pub struct CorsUnit {
    allowed_origins: AllowedOrigins,
    /// Rendered `Access-Control-Allow-Methods` value.
    allowed_methods: String,
    /// Rendered `Access-Control-Allow-Headers` value.
    allowed_headers: String,
    max_age: Option<Duration>,
}

impl Default for CorsUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl CorsUnit {
    /// Creates a permissive unit: any origin, `GET, POST, PUT, DELETE, OPTIONS`,
    /// `Content-Type, Authorization`, max age one day.
    #[must_use]
    pub fn new() -> Self {
        CorsBuilder::new().build()
    }

    /// Creates a new CORS builder.
    #[must_use]
    pub fn builder() -> CorsBuilder {
        CorsBuilder::new()
    }

    /// Returns the allowed origins.
    #[must_use]
    pub fn allowed_origins(&self) -> &AllowedOrigins {
        &self.allowed_origins
    }

    /// Returns the `Access-Control-Allow-Methods` value.
    #[must_use]
    pub fn allowed_methods(&self) -> &str {
        &self.allowed_methods
    }

    /// Returns the `Access-Control-Allow-Headers` value.
    #[must_use]
    pub fn allowed_headers(&self) -> &str {
        &self.allowed_headers
    }

    fn origin(request: &Request) -> Option<&str> {
        request
            .headers()
            .get(headers::ORIGIN)
            .and_then(|v| v.to_str().ok())
    }

    fn add_origin_header(&self, headers: &mut HeaderMap, origin: Option<&str>) {
        if let Some(value) = self.allowed_origins.header_value(origin) {
            headers.insert(headers::ALLOW_ORIGIN, value);
            if matches!(self.allowed_origins, AllowedOrigins::List(_)) {
                headers.append(headers::VARY, HeaderValue::from_static("origin"));
            }
        }
    }

    fn preflight_response(&self, origin: Option<&str>) -> Response {
        let mut response = Response::empty(StatusCode::OK);
        let headers = response.headers_mut();

        self.add_origin_header(headers, origin);
        if let Ok(value) = HeaderValue::from_str(&self.allowed_methods) {
            headers.insert(headers::ALLOW_METHODS, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.allowed_headers) {
            headers.insert(headers::ALLOW_HEADERS, value);
        }
        if let Some(max_age) = self.max_age {
            headers.insert(headers::MAX_AGE, HeaderValue::from(max_age.as_secs()));
        }

        response
    }

    pub(crate) fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            let origin = Self::origin(&request).map(String::from);

            // Preflights never reach the inner units
            if request.method() == Method::OPTIONS {
                return Ok(self.preflight_response(origin.as_deref()));
            }

            let mut cors = HeaderMap::new();
            self.add_origin_header(&mut cors, origin.as_deref());
            ctx.add_failure_headers(&cors);

            let mut response = next.run(ctx, request).await?;
            response.headers_mut().extend(cors);
            Ok(response)
        })
    }
}

/// Builder for [`CorsUnit`].
#[derive(Debug, Clone)]
pub struct CorsBuilder {
    allowed_origins: AllowedOrigins,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    max_age: Option<Duration>,
}

impl Default for CorsBuilder {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::Any,
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allowed_headers: ["Content-Type", "Authorization"].map(String::from).to_vec(),
            max_age: Some(Duration::from_secs(86400)), // 24 hours
        }
    }
}

impl CorsBuilder {
    /// Creates a new CORS builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows any origin (wildcard `*`).
    #[must_use]
    pub fn allow_any_origin(mut self) -> Self {
        self.allowed_origins = AllowedOrigins::Any;
        self
    }

    /// Adds an allowed origin, switching from wildcard to an explicit list.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        if let AllowedOrigins::List(origins) = &mut self.allowed_origins {
            origins.insert(origin.into());
        } else {
            self.allowed_origins = AllowedOrigins::List(BTreeSet::from([origin.into()]));
        }
        self
    }

    /// Sets the allowed origins. A `*` entry means any origin.
    #[must_use]
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins: BTreeSet<String> = origins.into_iter().map(Into::into).collect();
        self.allowed_origins = if origins.contains("*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        };
        self
    }

    /// Sets the allowed HTTP methods, in the order they are advertised.
    #[must_use]
    pub fn allow_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the allowed request headers, in the order they are advertised.
    #[must_use]
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the preflight cache duration. `None` omits the header.
    #[must_use]
    pub fn max_age(mut self, max_age: impl Into<Option<Duration>>) -> Self {
        self.max_age = max_age.into();
        self
    }

    /// Builds the CORS unit.
    #[must_use]
    pub fn build(self) -> CorsUnit {
        CorsUnit {
            allowed_origins: self.allowed_origins,
            allowed_methods: self.allowed_methods.join(", "),
            allowed_headers: self.allowed_headers.join(", "),
            max_age: self.max_age,
        }
    }
}
