//! Dispatch error taxonomy.
//!
//! Every error that can reach a response maps to a status code and a JSON
//! body of the form `{"error": kind, "message": text, "statusCode": n}`.

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;

use crate::routing::{MatchError, Method};

/// Boxed error returned by hooks and handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the dispatch pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Malformed input, e.g. an unparsable body.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The path exists but not for the requested method.
    #[error("method {method} is not allowed for {path}")]
    MethodNotAllowed {
        path: String,
        method: Method,
        allowed: Vec<Method>,
    },

    /// No route matched. Only used by transport shims once fallback is exhausted.
    #[error("no route for {method} {path}")]
    NotFound { method: Method, path: String },

    /// Anything escaping a hook or handler.
    #[error("handler failed: {0}")]
    Handler(String),

    /// The request deadline expired first.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl DispatchError {
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::BadRequest(_) => 400,
            DispatchError::MethodNotAllowed { .. } => 405,
            DispatchError::NotFound { .. } => 404,
            DispatchError::Handler(_) => 500,
            DispatchError::Timeout(_) => 504,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::BadRequest(_) => "BadRequest",
            DispatchError::MethodNotAllowed { .. } => "MethodNotAllowed",
            DispatchError::NotFound { .. } => "NotFound",
            DispatchError::Handler(_) => "HandlerError",
            DispatchError::Timeout(_) => "Timeout",
        }
    }

    /// Serialized error body.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
            "statusCode": self.status_code(),
        });
        if let DispatchError::MethodNotAllowed { allowed, .. } = self {
            body["allowed"] = json!(allowed);
        }
        body
    }

    /// Recover a typed error from a hook/handler failure.
    ///
    /// A boxed `DispatchError` keeps its kind; anything else is a `Handler` error.
    pub fn from_boxed(err: BoxError) -> Self {
        match err.downcast::<DispatchError>() {
            Ok(typed) => *typed,
            Err(other) => DispatchError::Handler(other.to_string()),
        }
    }
}

impl From<MatchError> for DispatchError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::MethodNotAllowed { path, method, allowed } => {
                DispatchError::MethodNotAllowed { path, method, allowed }
            }
        }
    }
}
