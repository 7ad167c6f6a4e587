//! Response handling: finalized dispatch response to HTTP response.

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;

use crate::dispatch::FinalResponse;
use crate::error::DispatchError;

pub fn into_response(out: FinalResponse) -> Response {
    let mut response = Response::new(Body::from(out.body));
    *response.status_mut() = StatusCode::from_u16(out.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in out.headers.as_map() {
        response.headers_mut().append(name.clone(), value.clone());
    }
    response
}

/// Error response produced before dispatch could start.
pub fn error_response(err: &DispatchError) -> Response {
    let mut response = Response::new(Body::from(err.to_json().to_string()));
    *response.status_mut() = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response
        .headers_mut()
        .insert("content-type", HeaderValue::from_static("application/json"));
    response
}
