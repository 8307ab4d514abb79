//! Rate limiting unit.
//!
//! Enforces a fixed-window request budget per client key. The key is the
//! authenticated user id when the Authentication unit attached one, else the
//! client address.
//!
//! ## Algorithm
//!
//! For each request, atomically per key:
//!
//! 1. load `(count, window_start)`, or start a window at `now`
//! 2. if `now - window_start > window`, reset to `(0, now)`
//! 3. increment `count` and store it
//!
//! If the new count exceeds `limit` the request is answered with
//! `429 Too Many Requests`; otherwise it is delegated. Both outcomes carry the
//! `X-RateLimit-*` headers.
//!
//! ## Example
//!
//! ```
//! use courier_core::ManualClock;
//! use courier_middleware::units::RateLimitUnit;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let unit = RateLimitUnit::builder()
//!     .limit(10)
//!     .window(Duration::from_secs(60))
//!     .clock(Arc::new(ManualClock::new(0)))
//!     .build();
//! assert_eq!(unit.limit(), 10);
//! ```

use crate::context::RequestContext;
use crate::store::{InMemoryRateLimitStore, RateLimitEntry, RateLimitStore};
use crate::unit::{BoxFuture, Next, PipelineResult};
use courier_core::{Clock, GatewayError, Request, Response, SystemClock};
use http::{HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;

/// Rate limit header names.
pub mod headers {
    /// Maximum requests allowed in the window.
    pub const LIMIT: &str = "x-ratelimit-limit";
    /// Remaining requests in current window.
    pub const REMAINING: &str = "x-ratelimit-remaining";
    /// Seconds until the window resets.
    pub const RESET: &str = "x-ratelimit-reset";
    /// Seconds to wait before retrying (on 429).
    pub const RETRY_AFTER: &str = "retry-after";
    /// Proxy-supplied client address chain.
    pub const FORWARDED_FOR: &str = "x-forwarded-for";
}

/// Default message returned when rate limited.
pub const DEFAULT_ERROR_MESSAGE: &str = "Too many requests. Please try again later.";

/// Key used when no client address is known.
const UNKNOWN_CLIENT: &str = "unknown";

/// Rate limiting unit.
///
/// Clones share the same store.
#[derive(Debug, Clone)]
pub struct RateLimitUnit {
    limit: u64,
    window: Duration,
    error_message: String,
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
}

/// Outcome of one budget check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decision {
    allowed: bool,
    remaining: u64,
    reset_secs: u64,
}

impl RateLimitUnit {
    /// Creates a new rate limit builder.
    #[must_use]
    pub fn builder() -> RateLimitBuilder {
        RateLimitBuilder::new()
    }

    /// Returns the maximum requests per window.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns the window length.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    /// Extracts the client key for a request.
    fn client_key(ctx: &RequestContext, request: &Request) -> String {
        if let Some(user_id) = ctx.identity().user_id() {
            return format!("user:{user_id}");
        }
        if let Some(addr) = ctx.remote_addr() {
            return format!("ip:{}", addr.ip());
        }
        // No transport address (e.g. behind a proxy in tests); take the first hop
        request
            .headers()
            .get(headers::FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map_or_else(|| UNKNOWN_CLIENT.to_string(), |ip| format!("ip:{ip}"))
    }

    /// Counts this request against `key` and decides whether it may proceed.
    fn check(&self, key: &str) -> Decision {
        let now = self.clock.now_secs();
        let window = self.window.as_secs();

        let entry = self.store.update(key, &mut |current| {
            let mut entry = match current {
                Some(entry) if !entry.is_expired(now, window) => entry,
                _ => RateLimitEntry::fresh(now),
            };
            entry.count = entry.count.saturating_add(1);
            entry
        });

        Decision {
            allowed: entry.count <= self.limit,
            remaining: self.limit.saturating_sub(entry.count),
            reset_secs: (entry.window_start + window).saturating_sub(now),
        }
    }

    fn add_headers(&self, headers: &mut HeaderMap, decision: Decision) {
        headers.insert(headers::LIMIT, HeaderValue::from(self.limit));
        headers.insert(headers::REMAINING, HeaderValue::from(decision.remaining));
        headers.insert(headers::RESET, HeaderValue::from(decision.reset_secs));
    }

    fn rejection(&self, decision: Decision) -> Response {
        let retry_after = decision.reset_secs.max(1);
        let mut response =
            GatewayError::rate_limited(self.error_message.clone(), Some(retry_after)).into_response();

        let headers = response.headers_mut();
        self.add_headers(headers, decision);
        headers.insert(headers::RETRY_AFTER, HeaderValue::from(retry_after));
        response
    }

    pub(crate) fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            let key = Self::client_key(ctx, &request);
            let decision = self.check(&key);

            if !decision.allowed {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    client_key = %key,
                    limit = self.limit,
                    "rate limit exceeded"
                );
                return Ok(self.rejection(decision));
            }

            let mut budget = HeaderMap::new();
            self.add_headers(&mut budget, decision);
            ctx.add_failure_headers(&budget);

            let mut response = next.run(ctx, request).await?;
            response.headers_mut().extend(budget);
            Ok(response)
        })
    }
}

/// Builder for [`RateLimitUnit`].
#[derive(Debug, Clone)]
pub struct RateLimitBuilder {
    limit: u64,
    window: Duration,
    error_message: String,
    store: Option<Arc<dyn RateLimitStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for RateLimitBuilder {
    fn default() -> Self {
        Self {
            limit: 100,
            window: Duration::from_secs(60),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            store: None,
            clock: None,
        }
    }
}

impl RateLimitBuilder {
    /// Creates a new rate limit builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of requests allowed per window.
    ///
    /// Default: 100 requests.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the time window for rate limiting.
    ///
    /// Default: 60 seconds. Sub-second precision is ignored.
    #[must_use]
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Sets the time window in seconds.
    #[must_use]
    pub fn window_secs(self, seconds: u64) -> Self {
        self.window(Duration::from_secs(seconds))
    }

    /// Sets the error message returned when rate limited.
    #[must_use]
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Sets the entry store. Default: a fresh [`InMemoryRateLimitStore`].
    #[must_use]
    pub fn store(mut self, store: Arc<dyn RateLimitStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the time source. Default: [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the rate limit unit.
    #[must_use]
    pub fn build(self) -> RateLimitUnit {
        RateLimitUnit {
            limit: self.limit,
            window: self.window,
            error_message: self.error_message,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryRateLimitStore::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Unit;
    use bytes::Bytes;
    use courier_core::{CallerIdentity, ManualClock, ResponseExt};
    use http::StatusCode;
    use std::net::SocketAddr;

    fn unit(limit: u64, window: u64, clock: &Arc<ManualClock>) -> RateLimitUnit {
        RateLimitUnit::builder()
            .limit(limit)
            .window_secs(window)
            .clock(Arc::clone(clock) as Arc<dyn Clock>)
            .build()
    }

    fn request() -> Request {
        http::Request::builder().uri("/api/v1/command").body(Bytes::new()).unwrap()
    }

    async fn send(unit: &Unit, addr: &str) -> Response {
        let mut ctx = RequestContext::new();
        ctx.set_remote_addr(addr.parse::<SocketAddr>().unwrap());
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(Response::empty(StatusCode::OK)) })
        });
        unit.process(&mut ctx, request(), next).await.unwrap()
    }

    fn header(response: &Response, name: &str) -> u64 {
        response.headers()[name].to_str().unwrap().parse().unwrap()
    }

    #[test]
    fn test_defaults() {
        let unit = RateLimitUnit::builder().build();
        assert_eq!(unit.limit(), 100);
        assert_eq!(unit.window(), Duration::from_secs(60));
    }

    #[test]
    fn test_client_key_prefers_user() {
        let mut ctx = RequestContext::new();
        ctx.set_remote_addr("10.0.0.1:4000".parse().unwrap());
        assert_eq!(RateLimitUnit::client_key(&ctx, &request()), "ip:10.0.0.1");

        ctx.set_identity(CallerIdentity::user("token:abc"));
        assert_eq!(RateLimitUnit::client_key(&ctx, &request()), "user:token:abc");
    }

    #[test]
    fn test_client_key_from_forwarded_for() {
        let ctx = RequestContext::new();
        let request = http::Request::builder()
            .header(headers::FORWARDED_FOR, "203.0.113.9, 10.0.0.1")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(RateLimitUnit::client_key(&ctx, &request), "ip:203.0.113.9");
        assert_eq!(RateLimitUnit::client_key(&ctx, &self::request()), UNKNOWN_CLIENT);
    }

    #[tokio::test]
    async fn test_headers_count_down() {
        let clock = Arc::new(ManualClock::new(1_000));
        let unit = Unit::from(unit(3, 60, &clock));

        let first = send(&unit, "10.0.0.1:1").await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(header(&first, headers::LIMIT), 3);
        assert_eq!(header(&first, headers::REMAINING), 2);
        assert_eq!(header(&first, headers::RESET), 60);

        clock.advance(15);
        let second = send(&unit, "10.0.0.1:2").await;
        assert_eq!(header(&second, headers::REMAINING), 1);
        assert_eq!(header(&second, headers::RESET), 45);
    }

    #[tokio::test]
    async fn test_rejects_over_limit() {
        let clock = Arc::new(ManualClock::new(0));
        let unit = Unit::from(unit(2, 60, &clock));

        assert_eq!(send(&unit, "10.0.0.1:1").await.status(), StatusCode::OK);
        assert_eq!(send(&unit, "10.0.0.1:1").await.status(), StatusCode::OK);

        clock.advance(10);
        let rejected = send(&unit, "10.0.0.1:1").await;
        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(header(&rejected, headers::REMAINING), 0);
        assert_eq!(header(&rejected, headers::RETRY_AFTER), 50);
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let clock = Arc::new(ManualClock::new(0));
        let unit = Unit::from(unit(1, 60, &clock));

        assert_eq!(send(&unit, "10.0.0.1:1").await.status(), StatusCode::OK);
        assert_eq!(send(&unit, "10.0.0.2:1").await.status(), StatusCode::OK);
        assert_eq!(
            send(&unit, "10.0.0.1:1").await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn test_window_resets_only_after_it_has_fully_elapsed() {
        let clock = Arc::new(ManualClock::new(0));
        let unit = Unit::from(unit(1, 60, &clock));

        assert_eq!(send(&unit, "10.0.0.1:1").await.status(), StatusCode::OK);

        // now - window_start == window: still the same window
        clock.set(60);
        assert_eq!(
            send(&unit, "10.0.0.1:1").await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );

        clock.set(61);
        let response = send(&unit, "10.0.0.1:1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, headers::REMAINING), 0);
    }

    #[tokio::test]
    async fn test_shared_store_across_clones() {
        let clock = Arc::new(ManualClock::new(0));
        let original = unit(1, 60, &clock);
        let clone = Unit::from(original.clone());
        let original = Unit::from(original);

        assert_eq!(send(&original, "10.0.0.1:1").await.status(), StatusCode::OK);
        assert_eq!(
            send(&clone, "10.0.0.1:1").await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
