//! Response side of the dispatch context.
//!
//! # Design Decisions
//! - One terminal transition: the first writer to flip `ended` wins; every
//!   later mutation or terminating write is refused and reported as `false`
//! - The flag flips under the same lock that guards status, headers and body,
//!   so a writer never observes a half-written response
//! - `done()` resolves once the response has ended (immediately if it already has)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::watch;

use super::headers::Headers;
use crate::error::DispatchError;

/// Value produced by a hook or handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
    Binary(Bytes),
}

impl Payload {
    /// Content type inferred when the writer did not set one.
    pub fn content_type(&self) -> &'static str {
        match self {
            Payload::Json(_) => "application/json",
            Payload::Text(_) => "text/plain; charset=utf-8",
            Payload::Binary(_) => "application/octet-stream",
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        match self {
            Payload::Json(value) => Bytes::from(value.to_string()),
            Payload::Text(text) => Bytes::from(text.clone()),
            Payload::Binary(bytes) => bytes.clone(),
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<Value> for Payload {
    /// JSON strings become plain text; everything else stays structured.
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Payload::Text(text),
            other => Payload::Json(other),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Payload::Binary(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Binary(Bytes::from(value))
    }
}

/// The finalized response handed back to a transport shim.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

#[derive(Debug)]
struct State {
    status: u16,
    headers: Headers,
    result: Option<Payload>,
    body: Bytes,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    ended: AtomicBool,
    done: watch::Sender<bool>,
}

/// Shared handle to one in-flight response.
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    inner: Arc<Inner>,
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseContext {
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    status: 200,
                    headers: Headers::new(),
                    result: None,
                    body: Bytes::new(),
                }),
                ended: AtomicBool::new(false),
                done,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_ended(&self) -> bool {
        self.inner.ended.load(Ordering::Acquire)
    }

    /// Alias of [`is_ended`](Self::is_ended).
    pub fn writable_ended(&self) -> bool {
        self.is_ended()
    }

    pub fn status(&self) -> u16 {
        self.state().status
    }

    /// Returns `false` once the response has ended.
    pub fn set_status(&self, status: u16) -> bool {
        self.mutate(|state| {
            state.status = status;
            true
        })
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.state().headers.get(name).map(str::to_string)
    }

    pub fn headers(&self) -> Headers {
        self.state().headers.clone()
    }

    /// Replace every value of `name`.
    ///
    /// Returns `false` once the response has ended or if the header is invalid.
    pub fn set_header(&self, name: &str, value: impl AsRef<str>) -> bool {
        self.mutate(|state| state.headers.insert(name, value))
    }

    /// Add a value for `name` alongside existing ones, e.g. a second `Set-Cookie`.
    pub fn append_header(&self, name: &str, value: impl AsRef<str>) -> bool {
        self.mutate(|state| state.headers.append(name, value))
    }

    /// The most recent value produced by the chain.
    pub fn result(&self) -> Option<Payload> {
        self.state().result.clone()
    }

    /// Returns `false` once the response has ended.
    pub fn set_result(&self, payload: Payload) -> bool {
        self.mutate(|state| {
            state.result = Some(payload);
            true
        })
    }

    /// Terminate with `payload` and the current status.
    pub fn end(&self, payload: impl Into<Payload>) -> bool {
        self.terminate(None, Some(payload.into()), false)
    }

    /// Terminate with `status` and `payload` in one step.
    pub fn end_with(&self, status: u16, payload: impl Into<Payload>) -> bool {
        self.terminate(Some(status), Some(payload.into()), false)
    }

    /// Terminate without a body.
    pub fn end_empty(&self) -> bool {
        self.terminate(None, None, false)
    }

    /// Terminate with the error's status and JSON body.
    pub fn fail(&self, err: &DispatchError) -> bool {
        self.terminate(Some(err.status_code()), Some(Payload::Json(err.to_json())), true)
    }

    /// Resolves once the response has ended.
    pub async fn done(&self) {
        let mut rx = self.inner.done.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|ended| *ended).await;
    }

    /// Copy of the status, headers and written body.
    pub fn snapshot(&self) -> FinalResponse {
        let state = self.state();
        FinalResponse {
            status: state.status,
            headers: state.headers.clone(),
            body: state.body.clone(),
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut State) -> bool) -> bool {
        let mut state = self.state();
        if self.is_ended() {
            return false;
        }
        f(&mut state)
    }

    fn terminate(&self, status: Option<u16>, payload: Option<Payload>, force_type: bool) -> bool {
        {
            let mut state = self.state();
            if self
                .inner
                .ended
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                tracing::trace!("response already ended, write suppressed");
                return false;
            }

            if let Some(status) = status {
                state.status = status;
            }
            if let Some(payload) = payload {
                if force_type || !state.headers.contains("content-type") {
                    state.headers.insert("content-type", payload.content_type());
                }
                state.body = payload.to_bytes();
                state.result = Some(payload);
            }
        }

        self.inner.done.send_replace(true);
        true
    }
}
