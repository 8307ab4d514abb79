//! JSON unit.
//!
//! On the way in, a request declaring `Content-Type: application/json` with a
//! non-empty body is parsed and the value stored on the [`RequestContext`];
//! malformed JSON is answered with a 400 envelope and the router never runs.
//! Other bodies pass through as raw bytes.
//!
//! On the way out, a structured response body (mapping or sequence) is
//! serialized to JSON text and `Content-Type: application/json` is set.

use crate::context::RequestContext;
use crate::unit::{BoxFuture, Next, PipelineResult};
use courier_core::{Body, GatewayError, Request, Response, APPLICATION_JSON};
use http::{header, HeaderValue};

/// Parses JSON requests and encodes structured responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonUnit;

impl JsonUnit {
    /// Creates a JSON unit.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns `true` when the request declares a JSON body.
    fn is_json(request: &Request) -> bool {
        request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| {
                v.trim_start()
                    .get(..APPLICATION_JSON.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(APPLICATION_JSON))
            })
    }

    fn encode(response: Response) -> Response {
        if !response.body().is_structured() {
            return response;
        }

        let (mut parts, body) = response.into_parts();
        parts
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        Response::from_parts(parts, Body::Bytes(body.into_bytes()))
    }

    pub(crate) fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            if Self::is_json(&request) && !request.body().is_empty() {
                match serde_json::from_slice(request.body()) {
                    Ok(value) => ctx.set_json_body(value),
                    Err(e) => {
                        let err = GatewayError::parse(format!("Invalid JSON in request body: {e}"));
                        return Ok(err.into_response());
                    }
                }
            }

            let response = next.run(ctx, request).await?;
            Ok(Self::encode(response))
        })
    }
}
