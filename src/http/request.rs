//! Request handling: HTTP request to dispatch context.
//!
//! # Responsibilities
//! - Carry the request ID into the context
//! - Enforce the body size limit while buffering
//! - Decode the body according to its content type
//!
//! # Design Decisions
//! - Headers are carried over as received, repeated names included
//! - A missing request ID is generated here so dispatch logs always carry one

use axum::body::Body;
use axum::http::Request;
use uuid::Uuid;

use crate::dispatch::RequestContext;
use crate::error::DispatchError;
use crate::routing::Method;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Buffer `request` into a [`RequestContext`].
pub async fn into_context(request: Request<Body>, max_body_size: usize) -> Result<RequestContext, DispatchError> {
    let (parts, body) = request.into_parts();

    let method = Method::try_from(&parts.method).map_err(|e| DispatchError::BadRequest(e.to_string()))?;
    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let mut ctx = RequestContext::new(method, url).with_headers(parts.headers);

    let request_id = ctx
        .headers()
        .get(X_REQUEST_ID)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    ctx = ctx.with_request_id(request_id);

    let bytes = axum::body::to_bytes(body, max_body_size)
        .await
        .map_err(|e| DispatchError::BadRequest(format!("failed to read body: {e}")))?;
    ctx.with_body(bytes)
}
