// crates/jd-rpc/src/server.rs
//
// RPC server setup: JdRpcServer, RpcConfig and the batch handler.
//
// A single tonic-hosted service mounted at `/api/trpc` accepts plain HTTP/1
// GET (queries) and POST (mutations). The request path names one or more
// procedures; each call is dispatched into the router concurrently and the
// results are encoded per call, so one failing call never affects the others.

use std::collections::BTreeMap;
use std::sync::Arc;

use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tonic::transport::Server;
use tonic::Status;

use jd_core::wire::{self, HttpMethod, ResponseEnvelope, RPC_PATH};
use jd_core::{RequestContext, Router, RpcError};

use crate::middleware;

/// Error type returned by the serve entry points.
pub type ServeError = Box<dyn std::error::Error + Send + Sync>;

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Configuration for the RPC server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

// ---------------------------------------------------------------------------
// HttpCall / HttpReply
// ---------------------------------------------------------------------------

/// Transport-independent view of an incoming HTTP request.
#[derive(Debug, Clone, Default)]
pub struct HttpCall {
    pub method: String,
    /// Request path, e.g. `/api/trpc/example.hello,session.getSession`.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Status and JSON body produced for an `HttpCall`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize response: {}", e);
            b"[]".to_vec()
        });
        Self { status, body }
    }
}

// ---------------------------------------------------------------------------
// TrpcHandler
// ---------------------------------------------------------------------------

/// Decodes batches, dispatches calls into the router and encodes results.
#[derive(Debug, Clone)]
pub struct TrpcHandler {
    router: Arc<Router>,
}

/// The decoded shape of one HTTP request.
struct DecodedBatch {
    method: HttpMethod,
    is_batch: bool,
    paths: Vec<String>,
    inputs: Vec<Value>,
}

impl TrpcHandler {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle one HTTP request carrying one call or a batch of calls.
    pub async fn handle(&self, call: HttpCall) -> HttpReply {
        let params = parse_query(call.query.as_deref().unwrap_or(""));
        let is_batch = matches!(params.get("batch").map(String::as_str), Some("1") | Some("true"));
        let paths = path_segment(&call.path)
            .map(|segment| {
                if is_batch {
                    wire::split_paths(&segment)
                } else {
                    vec![segment]
                }
            })
            .unwrap_or_default();

        let decoded = match decode_request(&call, &params, is_batch, paths.clone()) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(path = %call.path, code = %err.code, "Rejected RPC request: {}", err.message);
                return request_failure(&err, &paths, is_batch);
            }
        };

        let ctx = RequestContext::new(decoded.method, call.headers);
        let kind = decoded.method.procedure_kind();

        // Spawn every call so they run concurrently; await in order to keep
        // the response aligned with the request paths.
        let handles: Vec<_> = decoded
            .paths
            .iter()
            .cloned()
            .zip(decoded.inputs)
            .map(|(path, input)| {
                let router = Arc::clone(&self.router);
                let call_ctx = ctx.for_call(&path);
                tokio::spawn(async move {
                    let outcome = router.call(call_ctx, &path, kind, input).await;
                    (path, outcome)
                })
            })
            .collect();

        let mut envelopes = Vec::with_capacity(handles.len());
        for (handle, path) in handles.into_iter().zip(&decoded.paths) {
            let (path, outcome) = match handle.await {
                Ok(done) => done,
                Err(e) => (path.clone(), Err(RpcError::internal(format!("Procedure task failed: {}", e)))),
            };
            if let Err(err) = &outcome {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    path = %path,
                    code = %err.code,
                    "RPC call failed: {}",
                    err.message
                );
            }
            envelopes.push(ResponseEnvelope::from_outcome(&path, outcome));
        }

        let status = wire::batch_status(&envelopes);
        tracing::debug!(
            request_id = %ctx.request_id,
            calls = envelopes.len(),
            status,
            "RPC request complete"
        );

        if decoded.is_batch {
            HttpReply::json(status, &envelopes)
        } else {
            // Non-batch requests always carry exactly one call.
            match envelopes.pop() {
                Some(envelope) => HttpReply::json(status, &envelope),
                None => HttpReply::json(status, &Vec::<ResponseEnvelope>::new()),
            }
        }
    }
}

/// The procedure segment after `/api/trpc/`, percent-decoded.
fn path_segment(path: &str) -> Option<String> {
    let rest = path.strip_prefix(RPC_PATH)?.strip_prefix('/')?;
    let decoded = urlencoding::decode(rest).ok()?.into_owned();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

fn decode_request(
    call: &HttpCall,
    params: &BTreeMap<String, String>,
    is_batch: bool,
    paths: Vec<String>,
) -> Result<DecodedBatch, RpcError> {
    let method = HttpMethod::parse(&call.method).ok_or_else(|| {
        RpcError::method_not_supported(format!("Unsupported HTTP method {}", call.method))
    })?;

    if paths.is_empty() || paths.iter().any(String::is_empty) {
        return Err(RpcError::not_found(format!("No procedure path in {}", call.path)));
    }

    let raw_input = match method {
        HttpMethod::Get => params
            .get("input")
            .map(|s| serde_json::from_str::<Value>(s))
            .transpose(),
        HttpMethod::Post if call.body.iter().all(u8::is_ascii_whitespace) => Ok(None),
        HttpMethod::Post => serde_json::from_slice::<Value>(&call.body).map(Some),
    }
    .map_err(|e| RpcError::parse_error(format!("Input is not valid JSON: {}", e)))?;

    let inputs = if is_batch {
        wire::decode_batch_input(raw_input, paths.len())?
    } else {
        vec![raw_input.unwrap_or(Value::Null)]
    };

    Ok(DecodedBatch {
        method,
        is_batch,
        paths,
        inputs,
    })
}

/// Reply for a request that failed before any call was dispatched: one error
/// envelope per requested path.
fn request_failure(err: &RpcError, paths: &[String], is_batch: bool) -> HttpReply {
    let status = err.code.http_status();
    if is_batch && !paths.is_empty() {
        let envelopes: Vec<ResponseEnvelope> = paths
            .iter()
            .map(|p| ResponseEnvelope::failure(Some(p), err))
            .collect();
        HttpReply::json(status, &envelopes)
    } else {
        let path = paths.first().map(String::as_str);
        HttpReply::json(status, &ResponseEnvelope::failure(path, err))
    }
}

/// Parse an `application/x-www-form-urlencoded` query string. Later
/// duplicates win.
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

// ---------------------------------------------------------------------------
// JdRpcServer
// ---------------------------------------------------------------------------

/// The HTTP server exposing the application router.
#[derive(Clone)]
pub struct JdRpcServer {
    /// Server configuration.
    config: RpcConfig,
    handler: TrpcHandler,
}

impl std::fmt::Debug for JdRpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JdRpcServer")
            .field("config", &self.config)
            .field("procedures", &self.handler.router().len())
            .finish()
    }
}

impl JdRpcServer {
    /// Create a new server for `router`.
    pub fn new(config: RpcConfig, router: Router) -> Self {
        Self {
            config,
            handler: TrpcHandler::new(Arc::new(router)),
        }
    }

    pub fn handler(&self) -> &TrpcHandler {
        &self.handler
    }

    fn service(
        &self,
    ) -> tonic::service::interceptor::InterceptedService<
        TrpcService,
        fn(tonic::Request<()>) -> Result<tonic::Request<()>, Status>,
    > {
        tonic::service::interceptor::InterceptedService::new(
            TrpcService::new(self.handler.clone()),
            middleware::logging_interceptor as fn(_) -> _,
        )
    }

    /// Bind the configured address and serve until the process is terminated.
    pub async fn start(&self) -> Result<(), ServeError> {
        let addr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        tracing::info!("JD RPC server listening on http://{}{}", addr, RPC_PATH);

        Server::builder()
            .accept_http1(true)
            .add_service(self.service())
            .serve(addr)
            .await?;

        Ok(())
    }

    /// Serve on an already-bound listener (used with port 0 in tests).
    pub async fn serve_with_listener(&self, listener: tokio::net::TcpListener) -> Result<(), ServeError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("JD RPC server listening on http://{}{}", addr, RPC_PATH);
        }

        Server::builder()
            .accept_http1(true)
            .add_service(self.service())
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tonic Service Wiring
// ---------------------------------------------------------------------------
// tonic routes `/{NAME}/*rest` to a named service, so naming the service
// `api/trpc` mounts it at the RPC path. Bodies are plain JSON, no protobuf.

/// The tower service wrapper around `TrpcHandler`.
#[derive(Clone)]
pub struct TrpcService {
    inner: TrpcHandler,
}

impl std::fmt::Debug for TrpcService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrpcService").finish()
    }
}

impl TrpcService {
    fn new(inner: TrpcHandler) -> Self {
        Self { inner }
    }
}

impl tonic::server::NamedService for TrpcService {
    const NAME: &'static str = "api/trpc";
}

impl<B> tower_service::Service<http::Request<B>> for TrpcService
where
    B: HttpBody + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    B::Data: Send,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();

            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes().to_vec(),
                Err(e) => {
                    let e: Box<dyn std::error::Error + Send + Sync> = e.into();
                    tracing::error!("Failed to read request body: {}", e);
                    let err = RpcError::parse_error(format!("Failed to read request body: {}", e));
                    let reply = HttpReply::json(400, &ResponseEnvelope::failure(None, &err));
                    return Ok(build_response(reply));
                }
            };

            let call = HttpCall {
                method: parts.method.as_str().to_string(),
                path: parts.uri.path().to_string(),
                query: parts.uri.query().map(str::to_string),
                headers: middleware::header_pairs(&parts.headers),
                body,
            };

            Ok(build_response(inner.handle(call).await))
        })
    }
}

/// Wrap a reply as a JSON HTTP response.
fn build_response(reply: HttpReply) -> http::Response<tonic::body::BoxBody> {
    let status = http::StatusCode::from_u16(reply.status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
    let body = http_body_util::Full::new(bytes::Bytes::from(reply.body))
        .map_err(|never: std::convert::Infallible| -> Status { match never {} })
        .boxed_unsync();

    let (mut parts, body) = http::Response::new(body).into_parts();
    parts.status = status;
    parts
        .headers
        .insert(http::header::CONTENT_TYPE, http::HeaderValue::from_static("application/json"));
    http::Response::from_parts(parts, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jd_core::{ErrorCode, Procedure, ProcedureGroup, ProcedureKind};
    use serde_json::json;

    fn handler() -> TrpcHandler {
        let router = Router::builder()
            .group(crate::handlers::example::example_group())
            .group(ProcedureGroup::new("debug").register(
                "cookie",
                Procedure::new(ProcedureKind::Query, |ctx: RequestContext, _input| async move {
                    Ok(json!(ctx.cookie("token")))
                }),
            ))
            .build()
            .unwrap();
        TrpcHandler::new(Arc::new(router))
    }

    fn get(path: &str, query: &str) -> HttpCall {
        HttpCall {
            method: "GET".to_string(),
            path: path.to_string(),
            query: Some(query.to_string()),
            ..Default::default()
        }
    }

    fn body(reply: &HttpReply) -> Value {
        serde_json::from_slice(&reply.body).unwrap()
    }

    fn encoded_input(value: Value) -> String {
        urlencoding::encode(&value.to_string()).into_owned()
    }

    #[tokio::test]
    async fn test_batched_get_resolves_each_call() {
        let query = format!(
            "batch=1&input={}",
            encoded_input(json!({ "0": { "name": "from tRPC" }, "1": { "name": "again" } }))
        );
        let reply = handler()
            .handle(get("/api/trpc/example.hello,example.hello", &query))
            .await;
        assert_eq!(reply.status, 200);
        assert_eq!(
            body(&reply),
            json!([
                { "result": { "data": "Hello from tRPC" } },
                { "result": { "data": "Hello again" } }
            ])
        );
    }

    #[tokio::test]
    async fn test_mixed_batch_is_multi_status() {
        let query = format!("batch=1&input={}", encoded_input(json!({ "0": { "name": "x" } })));
        let reply = handler()
            .handle(get("/api/trpc/example.hello,example.missing", &query))
            .await;
        assert_eq!(reply.status, 207);
        let value = body(&reply);
        assert_eq!(value[0], json!({ "result": { "data": "Hello x" } }));
        assert_eq!(value[1]["error"]["data"]["code"], json!("NOT_FOUND"));
        assert_eq!(value[1]["error"]["data"]["path"], json!("example.missing"));
    }

    #[tokio::test]
    async fn test_single_call_without_batch_flag() {
        let query = format!("input={}", encoded_input(json!({ "name": "solo" })));
        let reply = handler().handle(get("/api/trpc/example.hello", &query)).await;
        assert_eq!(reply.status, 200);
        assert_eq!(body(&reply), json!({ "result": { "data": "Hello solo" } }));
    }

    #[tokio::test]
    async fn test_post_runs_mutations() {
        let call = HttpCall {
            method: "POST".to_string(),
            path: "/api/trpc/example.random".to_string(),
            query: Some("batch=1".to_string()),
            body: serde_json::to_vec(&json!({ "0": { "num": 1 } })).unwrap(),
            ..Default::default()
        };
        let reply = handler().handle(call).await;
        assert_eq!(reply.status, 200);
        let value = body(&reply)[0]["result"]["data"].as_f64().unwrap();
        assert!((0.0..100.0).contains(&value));
    }

    #[tokio::test]
    async fn test_mutation_via_get_is_rejected() {
        let query = format!("batch=1&input={}", encoded_input(json!({ "0": { "num": 1 } })));
        let reply = handler().handle(get("/api/trpc/example.random", &query)).await;
        assert_eq!(reply.status, 405);
        assert_eq!(body(&reply)[0]["error"]["data"]["code"], json!("METHOD_NOT_SUPPORTED"));
    }

    #[tokio::test]
    async fn test_invalid_json_input_is_parse_error() {
        let reply = handler()
            .handle(get("/api/trpc/example.hello", "batch=1&input=%7Bnot-json"))
            .await;
        assert_eq!(reply.status, 400);
        let err: ResponseEnvelope = serde_json::from_value(body(&reply)[0].clone()).unwrap();
        assert_eq!(err.into_result().unwrap_err().code, ErrorCode::ParseError);
    }

    #[tokio::test]
    async fn test_unsupported_method_and_missing_path() {
        let reply = handler()
            .handle(HttpCall {
                method: "DELETE".to_string(),
                path: "/api/trpc/example.hello".to_string(),
                ..Default::default()
            })
            .await;
        assert_eq!(reply.status, 405);

        let reply = handler().handle(get("/api/trpc/", "")).await;
        assert_eq!(reply.status, 404);
    }

    #[tokio::test]
    async fn test_headers_reach_request_context() {
        let mut call = get("/api/trpc/debug.cookie", "batch=1");
        call.headers = vec![("Cookie".to_string(), "token=abc".to_string())];
        let reply = handler().handle(call).await;
        assert_eq!(body(&reply), json!([{ "result": { "data": "abc" } }]));
    }

    #[tokio::test]
    async fn test_service_collects_body_and_sets_json_reply() {
        use tower_service::Service;

        let mut service = TrpcService::new(handler());
        let request = http::Request::builder()
            .method("POST")
            .uri("/api/trpc/example.random?batch=1")
            .body(http_body_util::Full::new(bytes::Bytes::from_static(b"{\"0\":{\"num\":1}}")))
            .unwrap();

        let response = service.call(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value[0]["result"]["data"].is_number());
    }

    #[tokio::test]
    async fn test_service_passes_error_status_through() {
        use tower_service::Service;

        let mut service = TrpcService::new(handler());
        let request = http::Request::builder()
            .method("GET")
            .uri("/api/trpc/example.missing?batch=1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .unwrap();

        let response = service.call(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_parse_query_decodes_form_encoding() {
        let params = parse_query("batch=1&input=%7B%22a%22%3A%22b+c%22%7D&flag");
        assert_eq!(params.get("batch").map(String::as_str), Some("1"));
        assert_eq!(params.get("input").map(String::as_str), Some("{\"a\":\"b c\"}"));
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
    }
}
