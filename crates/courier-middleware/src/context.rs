//! Per-request context.
//!
//! The [`RequestContext`] carries state through the chain alongside the
//! request. Units enrich it on the way in (identity, parsed JSON body) and the
//! terminal handler reads it.

use courier_core::{CallerIdentity, RequestId};
use http::HeaderMap;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Instant;

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Context that flows through the chain.
///
/// # Example
///
/// ```
/// use courier_middleware::context::RequestContext;
/// use courier_core::CallerIdentity;
///
/// let mut ctx = RequestContext::new();
/// assert!(ctx.identity().is_anonymous());
///
/// ctx.set_identity(CallerIdentity::user("u-1"));
/// assert_eq!(ctx.identity().user_id(), Some("u-1"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// The identity attached by the Authentication unit.
    identity: CallerIdentity,

    /// Peer address reported by the transport.
    remote_addr: Option<SocketAddr>,

    /// Request body parsed by the JSON unit.
    json_body: Option<Value>,

    /// When the request entered the chain.
    started_at: Instant,

    /// Headers outer units want on the response even if the inner chain
    /// fails or panics.
    failure_headers: HeaderMap,
}

impl RequestContext {
    /// Creates a context with a fresh request id and anonymous identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            identity: CallerIdentity::Anonymous,
            remote_addr: None,
            json_body: None,
            started_at: Instant::now(),
            failure_headers: HeaderMap::new(),
        }
    }

    /// Creates a context for a request arriving from `remote_addr`.
    ///
    /// Adopts the request id from an inbound `x-request-id` header when it
    /// holds a valid UUID.
    #[must_use]
    pub fn for_request<B>(request: &http::Request<B>, remote_addr: Option<SocketAddr>) -> Self {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<RequestId>().ok())
            .unwrap_or_default();

        Self {
            request_id,
            remote_addr,
            ..Self::new()
        }
    }

    /// Returns the request id.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the caller identity.
    #[must_use]
    pub fn identity(&self) -> &CallerIdentity {
        &self.identity
    }

    /// Sets the caller identity.
    ///
    /// This should only be called by the Authentication unit.
    pub fn set_identity(&mut self, identity: CallerIdentity) {
        self.identity = identity;
    }

    /// Returns the peer address, if the transport reported one.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Sets the peer address.
    pub fn set_remote_addr(&mut self, addr: SocketAddr) {
        self.remote_addr = Some(addr);
    }

    /// Returns the parsed JSON request body, if the JSON unit produced one.
    #[must_use]
    pub fn json_body(&self) -> Option<&Value> {
        self.json_body.as_ref()
    }

    /// Stores the parsed JSON request body.
    ///
    /// This should only be called by the JSON unit.
    pub fn set_json_body(&mut self, body: Value) {
        self.json_body = Some(body);
    }

    /// Removes and returns the parsed JSON request body.
    pub fn take_json_body(&mut self) -> Option<Value> {
        self.json_body.take()
    }

    /// Records headers the ErrorHandling unit must attach if it ends up
    /// building the response from an error or a panic.
    ///
    /// Later values for the same name replace earlier ones.
    pub fn add_failure_headers(&mut self, headers: &HeaderMap) {
        for (name, value) in headers {
            self.failure_headers.insert(name.clone(), value.clone());
        }
    }

    /// Removes and returns the recorded failure headers.
    pub fn take_failure_headers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.failure_headers)
    }

    /// Returns the elapsed time since the request entered the chain.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
