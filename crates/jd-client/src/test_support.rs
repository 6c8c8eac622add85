// crates/jd-client/src/test_support.rs
//
// In-process transport and identity provider for client tests. Requests are
// recorded and served by the real batch handler over the application router.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use jd_core::{IdentityProvider, RequestContext, RpcError, Session, SessionUser};
use jd_rpc::{app_router, HttpCall, TrpcHandler};

use crate::error::ClientError;
use crate::link::{HttpBatchLink, LinkConfig};
use crate::transport::{HttpTransport, TransportRequest, TransportResponse};

/// Identity provider whose single session can be switched on and off.
#[derive(Default)]
pub struct SwitchableProvider {
    session: RwLock<Option<Session>>,
}

impl SwitchableProvider {
    pub async fn sign_in(&self, name: &str) {
        *self.session.write().await = Some(Session {
            user: SessionUser {
                id: Some(format!("id-{}", name)),
                name: Some(name.to_string()),
                ..Default::default()
            },
            expires: None,
        });
    }

    pub async fn sign_out(&self) {
        *self.session.write().await = None;
    }
}

#[async_trait]
impl IdentityProvider for SwitchableProvider {
    async fn get_session(&self, _ctx: &RequestContext) -> Result<Option<Session>, RpcError> {
        Ok(self.session.read().await.clone())
    }
}

/// Signs in whoever presents an `authjs.session-token` cookie; the token value
/// is the user name.
pub struct CookieProvider;

#[async_trait]
impl IdentityProvider for CookieProvider {
    async fn get_session(&self, ctx: &RequestContext) -> Result<Option<Session>, RpcError> {
        Ok(ctx.cookie("authjs.session-token").map(|name| Session {
            user: SessionUser {
                name: Some(name.to_string()),
                ..Default::default()
            },
            expires: None,
        }))
    }
}

/// Records every request; serves them in-process unless built with `failing`.
pub struct CountingTransport {
    handler: Option<TrpcHandler>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl CountingTransport {
    pub fn new(handler: TrpcHandler) -> Self {
        Self {
            handler: Some(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            handler: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl HttpTransport for CountingTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ClientError> {
        self.requests.lock().await.push(request.clone());
        let handler = match &self.handler {
            Some(handler) => handler,
            None => return Err(ClientError::Transport("connection refused".to_string())),
        };

        let url = url::Url::parse(&request.url)
            .map_err(|e| ClientError::Transport(format!("bad URL {}: {}", request.url, e)))?;
        let (path, query) = (url.path().to_string(), url.query().map(str::to_string));
        let reply = handler
            .handle(HttpCall {
                method: request.method.as_str().to_string(),
                path,
                query,
                headers: request.headers,
                body: request.body.unwrap_or_default().into_bytes(),
            })
            .await;
        Ok(TransportResponse {
            status: reply.status,
            body: reply.body,
        })
    }
}

/// Link over the application router with a logged-out provider.
pub fn app_link(config: LinkConfig) -> (HttpBatchLink, Arc<CountingTransport>) {
    app_link_with_provider(config, Arc::new(SwitchableProvider::default()))
}

pub fn app_link_with_provider(
    config: LinkConfig,
    provider: Arc<dyn IdentityProvider>,
) -> (HttpBatchLink, Arc<CountingTransport>) {
    let router = app_router(provider).expect("application router builds");
    let transport = Arc::new(CountingTransport::new(TrpcHandler::new(Arc::new(router))));
    let link = HttpBatchLink::new(config, transport.clone());
    (link, transport)
}
