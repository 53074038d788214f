//! The request/response boundary to the hosted database.
//! Paths double as cache keys, so a read of `path` is what [`crate::QueryCache::revalidate`] stores under `path`.

#[cfg(any(test, feature = "testing"))]
use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WriteRequest {
    pub method: Method,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl WriteRequest {
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Patch,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }

    /// The path without its query string.
    pub fn resource(&self) -> &str {
        self.path
            .split_once('?')
            .map(|(resource, _)| resource)
            .unwrap_or(&self.path)
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("failed to parse response: {0}")]
    Parse(String),
}

#[derive(serde::Deserialize)]
struct ErrorPayload {
    message: String,
}

impl RemoteError {
    /// Build a rejection from a non-success response, preferring the payload's `message` field.
    pub fn rejected(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorPayload>(body)
            .map(|payload| payload.message)
            .unwrap_or_else(|_| {
                if body.trim().is_empty() {
                    "Unknown error".to_string()
                } else {
                    body.to_string()
                }
            });
        RemoteError::Rejected { status, message }
    }
}

#[allow(async_fn_in_trait)]
pub trait Remote {
    async fn fetch(&self, path: &str) -> Result<serde_json::Value, RemoteError>;

    async fn write(&self, request: WriteRequest) -> Result<serde_json::Value, RemoteError>;
}

impl<R: Remote> Remote for &R {
    async fn fetch(&self, path: &str) -> Result<serde_json::Value, RemoteError> {
        (**self).fetch(path).await
    }

    async fn write(&self, request: WriteRequest) -> Result<serde_json::Value, RemoteError> {
        (**self).write(request).await
    }
}

#[cfg(any(test, feature = "testing"))]
type WriteHandler = Box<
    dyn Fn(
        &mut BTreeMap<String, serde_json::Value>,
        &WriteRequest,
    ) -> Result<serde_json::Value, RemoteError>,
>;

/// An in-memory stand-in for the hosted database.
///
/// Resources are JSON values keyed by path. The default write handler treats every resource as an
/// array of rows with an `id` field: POST appends, PATCH replaces the row with the same id, and
/// DELETE removes the rows matching `?id=eq.<id>`.
#[cfg(any(test, feature = "testing"))]
pub struct MemoryRemote {
    resources: RefCell<BTreeMap<String, serde_json::Value>>,
    handler: WriteHandler,
    fail_writes: Cell<bool>,
    yield_on_write: Cell<bool>,
    write_delays: RefCell<BTreeMap<String, u32>>,
    writes: RefCell<Vec<WriteRequest>>,
}

#[cfg(any(test, feature = "testing"))]
impl Default for MemoryRemote {
    fn default() -> Self {
        Self {
            resources: RefCell::new(BTreeMap::new()),
            handler: Box::new(apply_rest_write),
            fail_writes: Cell::new(false),
            yield_on_write: Cell::new(false),
            write_delays: RefCell::new(BTreeMap::new()),
            writes: RefCell::new(Vec::new()),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(
        handler: impl Fn(
            &mut BTreeMap<String, serde_json::Value>,
            &WriteRequest,
        ) -> Result<serde_json::Value, RemoteError>
        + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            ..Self::default()
        }
    }

    pub fn insert(&self, path: impl Into<String>, value: serde_json::Value) {
        self.resources.borrow_mut().insert(path.into(), value);
    }

    pub fn resource(&self, path: &str) -> Option<serde_json::Value> {
        self.resources.borrow().get(path).cloned()
    }

    /// Every write received so far, including failed ones.
    pub fn writes(&self) -> Vec<WriteRequest> {
        self.writes.borrow().clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Make every write suspend once before completing, so concurrent writes interleave.
    pub fn set_yield_on_write(&self, yield_on_write: bool) {
        self.yield_on_write.set(yield_on_write);
    }

    /// Make writes to exactly `path` suspend `polls` extra times, so they finish after other writes.
    pub fn set_write_delay(&self, path: impl Into<String>, polls: u32) {
        self.write_delays.borrow_mut().insert(path.into(), polls);
    }
}

#[cfg(any(test, feature = "testing"))]
impl Remote for MemoryRemote {
    async fn fetch(&self, path: &str) -> Result<serde_json::Value, RemoteError> {
        self.resources
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::rejected(404, r#"{"message":"not found"}"#))
    }

    async fn write(&self, request: WriteRequest) -> Result<serde_json::Value, RemoteError> {
        self.writes.borrow_mut().push(request.clone());
        let delay = self.write_delays.borrow().get(&request.path).copied();
        let polls = u32::from(self.yield_on_write.get()) + delay.unwrap_or(0);
        Suspend(polls).await;
        if self.fail_writes.get() {
            return Err(RemoteError::Transport("network unreachable".to_string()));
        }
        let mut resources = self.resources.borrow_mut();
        (self.handler)(&mut resources, &request)
    }
}

#[cfg(any(test, feature = "testing"))]
/// Returns `Pending` the given number of times before completing.
struct Suspend(u32);

#[cfg(any(test, feature = "testing"))]
impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 == 0 {
            Poll::Ready(())
        } else {
            self.0 -= 1;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

#[cfg(any(test, feature = "testing"))]
pub fn apply_rest_write(
    resources: &mut BTreeMap<String, serde_json::Value>,
    request: &WriteRequest,
) -> Result<serde_json::Value, RemoteError> {
    use serde_json::Value;

    let rows = resources
        .entry(request.resource().to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(rows) = rows else {
        return Err(RemoteError::rejected(
            400,
            r#"{"message":"resource is not a collection"}"#,
        ));
    };

    match request.method {
        Method::Get => Ok(Value::Array(rows.clone())),
        Method::Post => {
            let body = request.body.clone().unwrap_or(Value::Null);
            rows.push(body.clone());
            Ok(body)
        }
        Method::Patch => {
            let body = request.body.clone().unwrap_or(Value::Null);
            let id = body.get("id").cloned();
            match rows.iter_mut().find(|row| row.get("id") == id.as_ref()) {
                Some(row) => {
                    *row = body.clone();
                    Ok(body)
                }
                None => Err(RemoteError::rejected(404, r#"{"message":"row not found"}"#)),
            }
        }
        Method::Delete => {
            let id = request
                .path
                .split_once("id=eq.")
                .map(|(_, id)| id.to_string());
            let before = rows.len();
            rows.retain(|row| row.get("id").and_then(Value::as_str) != id.as_deref());
            Ok(serde_json::json!({ "deleted": before - rows.len() }))
        }
    }
}
