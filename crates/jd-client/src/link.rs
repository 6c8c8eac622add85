// crates/jd-client/src/link.rs
//
// HttpBatchLink: coalesces calls issued in the same scheduling tick into one
// HTTP request per procedure kind.
//
// The first call enqueued into an empty queue yields once, then spawns the
// drain. Every call its task enqueues meanwhile (e.g. the other branches of a
// `tokio::join!`) rides in the same batch, whatever the runtime flavor. Each
// caller gets its own oneshot; results are matched by position.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{oneshot, Mutex, RwLock};

use jd_core::wire::{self, HttpMethod, ResponseEnvelope};
use jd_core::{ProcedureKind, RpcError};

use crate::error::ClientError;
use crate::transport::{HttpTransport, ReqwestTransport, TransportRequest, TransportResponse};

/// Link configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Endpoint URL, e.g. `http://localhost:3000/api/trpc`.
    pub url: String,
    /// Headers attached to every batch (e.g. `cookie`).
    pub headers: Vec<(String, String)>,
    /// Split a tick into several requests above this many calls.
    pub max_batch_size: Option<usize>,
}

impl LinkConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            max_batch_size: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = Some(size.max(1));
        self
    }
}

struct PendingCall {
    path: String,
    input: Option<Value>,
    reply: oneshot::Sender<Result<Value, ClientError>>,
}

#[derive(Default)]
struct Queues {
    queries: Vec<PendingCall>,
    mutations: Vec<PendingCall>,
}

impl Queues {
    fn for_kind(&mut self, kind: ProcedureKind) -> &mut Vec<PendingCall> {
        match kind {
            ProcedureKind::Query => &mut self.queries,
            ProcedureKind::Mutation => &mut self.mutations,
        }
    }
}

struct LinkInner {
    /// Read once per drain; headers can change between batches.
    config: RwLock<LinkConfig>,
    transport: Arc<dyn HttpTransport>,
    pending: Mutex<Queues>,
}

/// Batching link to the RPC endpoint. Cheap to clone; clones share the queue.
#[derive(Clone)]
pub struct HttpBatchLink {
    inner: Arc<LinkInner>,
}

impl std::fmt::Debug for HttpBatchLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.config.try_read() {
            Ok(config) => f.debug_struct("HttpBatchLink").field("config", &*config).finish(),
            Err(_) => f.debug_struct("HttpBatchLink").finish_non_exhaustive(),
        }
    }
}

impl HttpBatchLink {
    pub fn new(config: LinkConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            inner: Arc::new(LinkInner {
                config: RwLock::new(config),
                transport,
                pending: Mutex::new(Queues::default()),
            }),
        }
    }

    /// Link over the default reqwest transport.
    pub fn with_reqwest(config: LinkConfig) -> Self {
        Self::new(config, Arc::new(ReqwestTransport::new()))
    }

    /// Snapshot of the current configuration.
    pub async fn config(&self) -> LinkConfig {
        self.inner.config.read().await.clone()
    }

    /// Replace every header named `name` (case-insensitive) with `value`, or
    /// drop it when `value` is `None`. Applies to batches sent afterwards.
    pub async fn set_header(&self, name: &str, value: Option<String>) {
        let mut config = self.inner.config.write().await;
        config.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        if let Some(value) = value {
            config.headers.push((name.to_string(), value));
        }
    }

    /// Enqueue one call and wait for its result.
    ///
    /// Dropping the returned future discards the result; the batch it joined
    /// is still sent.
    pub async fn call(
        &self,
        kind: ProcedureKind,
        path: impl Into<String>,
        input: Option<Value>,
    ) -> Result<Value, ClientError> {
        let (reply, rx) = oneshot::channel();
        let schedule_flush = {
            let mut queues = self.inner.pending.lock().await;
            let queue = queues.for_kind(kind);
            let was_empty = queue.is_empty();
            queue.push(PendingCall {
                path: path.into(),
                input,
                reply,
            });
            was_empty
        };

        if schedule_flush {
            // Yield before scheduling the drain so calls joined with this one
            // in the same task are queued first, on any runtime flavor. The
            // guard schedules the drain even if this future is dropped here.
            let flush = ScheduledFlush {
                inner: Some(Arc::clone(&self.inner)),
                kind,
            };
            tokio::task::yield_now().await;
            drop(flush);
        }

        rx.await
            .map_err(|_| ClientError::Transport("batch was dropped before completing".to_string()))?
    }
}

/// Spawns the drain of one queue when dropped.
struct ScheduledFlush {
    inner: Option<Arc<LinkInner>>,
    kind: ProcedureKind,
}

impl Drop for ScheduledFlush {
    fn drop(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        let kind = self.kind;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { inner.flush(kind).await });
            }
            Err(_) => tracing::warn!("No runtime to flush pending {} calls", kind),
        }
    }
}

impl LinkInner {
    async fn flush(&self, kind: ProcedureKind) {
        let calls = std::mem::take(self.pending.lock().await.for_kind(kind));
        if calls.is_empty() {
            return;
        }

        let config = self.config.read().await.clone();
        let chunk_size = config.max_batch_size.unwrap_or(calls.len()).max(1);
        let mut calls = calls.into_iter().peekable();
        while calls.peek().is_some() {
            let chunk: Vec<PendingCall> = calls.by_ref().take(chunk_size).collect();
            self.send_batch(&config, kind, chunk).await;
        }
    }

    async fn send_batch(&self, config: &LinkConfig, kind: ProcedureKind, calls: Vec<PendingCall>) {
        let mut paths = Vec::with_capacity(calls.len());
        let mut inputs = Vec::with_capacity(calls.len());
        let mut replies = Vec::with_capacity(calls.len());
        for call in calls {
            paths.push(call.path);
            inputs.push(call.input);
            replies.push(call.reply);
        }

        let request = build_request(config, kind, &paths, &inputs);
        tracing::debug!(method = %request.method, calls = paths.len(), "Sending RPC batch");

        let outcome = match self.transport.send(request).await {
            Ok(response) => decode_response(&response, paths.len()),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(results) => {
                for (reply, result) in replies.into_iter().zip(results) {
                    // The caller may have gone away; its result is discarded.
                    let _ = reply.send(result.map_err(ClientError::Rpc));
                }
            }
            Err(e) => {
                tracing::warn!(paths = %wire::join_paths(&paths), "RPC batch failed: {}", e);
                for reply in replies {
                    let _ = reply.send(Err(e.clone()));
                }
            }
        }
    }
}

/// Build the HTTP request for one batch.
pub fn build_request(
    config: &LinkConfig,
    kind: ProcedureKind,
    paths: &[String],
    inputs: &[Option<Value>],
) -> TransportRequest {
    let method = kind.http_method();
    let mut url = format!(
        "{}/{}?batch=1",
        config.url.trim_end_matches('/'),
        wire::join_paths(paths)
    );
    let encoded = wire::encode_batch_input(inputs);

    let body = match method {
        HttpMethod::Get => {
            if let Some(input) = encoded {
                url.push_str("&input=");
                url.push_str(&urlencoding::encode(&input.to_string()));
            }
            None
        }
        HttpMethod::Post => Some(encoded.unwrap_or_else(|| Value::Object(Default::default())).to_string()),
    };

    TransportRequest {
        method,
        url,
        headers: config.headers.clone(),
        body,
    }
}

/// Split a batch response into per-call results.
///
/// A request-level error (single envelope instead of an array) applies to
/// every call.
pub fn decode_response(
    response: &TransportResponse,
    expected: usize,
) -> Result<Vec<Result<Value, RpcError>>, ClientError> {
    let envelopes: Vec<ResponseEnvelope> = match serde_json::from_slice(&response.body) {
        Ok(envelopes) => envelopes,
        Err(batch_err) => match serde_json::from_slice::<ResponseEnvelope>(&response.body) {
            Ok(single) => vec![single; expected],
            Err(_) => {
                return Err(ClientError::InvalidResponse(format!(
                    "HTTP {}: {}",
                    response.status, batch_err
                )))
            }
        },
    };

    if envelopes.len() != expected {
        return Err(ClientError::InvalidResponse(format!(
            "expected {} results, got {}",
            expected,
            envelopes.len()
        )));
    }

    Ok(envelopes.into_iter().map(ResponseEnvelope::into_result).collect())
}
