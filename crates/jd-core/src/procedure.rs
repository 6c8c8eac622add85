// crates/jd-core/src/procedure.rs
//
// Procedure definitions: the static contract trait (`ProcedureDef`) and the
// type-erased `Procedure` the router stores and dispatches to.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RequestContext;
use crate::error::RpcError;
use crate::wire::HttpMethod;

/// Whether a procedure reads or mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    Query,
    Mutation,
}

impl ProcedureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcedureKind::Query => "query",
            ProcedureKind::Mutation => "mutation",
        }
    }

    /// HTTP method a batch of this kind travels with.
    pub fn http_method(self) -> HttpMethod {
        match self {
            ProcedureKind::Query => HttpMethod::Get,
            ProcedureKind::Mutation => HttpMethod::Post,
        }
    }
}

impl std::fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one procedure of the application router.
///
/// Server and client share these types, so the router's shape is known at
/// compile time on both sides without a network round trip.
pub trait ProcedureDef: Send + Sync + 'static {
    /// Group the procedure lives in (first path segment).
    const GROUP: &'static str;
    /// Operation name inside the group.
    const NAME: &'static str;
    const KIND: ProcedureKind;

    type Input: Serialize + DeserializeOwned + Send + Sync + 'static;
    type Output: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Input validation run after deserialization. Rejections become
    /// `BAD_REQUEST`.
    fn validate(_input: &Self::Input) -> Result<(), String> {
        Ok(())
    }

    /// Dotted path, `GROUP.NAME`.
    fn path() -> String {
        format!("{}.{}", Self::GROUP, Self::NAME)
    }
}

/// Boxed future returned by an erased handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, RpcError>> + Send>>;

type ErasedHandler = Arc<dyn Fn(RequestContext, Value) -> HandlerFuture + Send + Sync>;

/// A registered procedure: its kind plus a JSON-in/JSON-out handler.
#[derive(Clone)]
pub struct Procedure {
    kind: ProcedureKind,
    handler: ErasedHandler,
    /// Group declared by the contract, for typed registrations.
    pub(crate) contract_group: Option<&'static str>,
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Procedure")
            .field("kind", &self.kind)
            .field("contract_group", &self.contract_group)
            .finish()
    }
}

impl Procedure {
    /// Build a procedure from a raw JSON handler.
    pub fn new<F, Fut>(kind: ProcedureKind, handler: F) -> Self
    where
        F: Fn(RequestContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        let handler: ErasedHandler = Arc::new(move |ctx: RequestContext, input: Value| {
            Box::pin(handler(ctx, input)) as HandlerFuture
        });
        Self {
            kind,
            handler,
            contract_group: None,
        }
    }

    /// Build a procedure implementing the contract `D`.
    ///
    /// Input is deserialized into `D::Input` and validated before the handler
    /// runs; the output is serialized back to JSON.
    pub fn typed<D, F, Fut>(handler: F) -> Self
    where
        D: ProcedureDef,
        F: Fn(RequestContext, D::Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<D::Output, RpcError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased: ErasedHandler = Arc::new(move |ctx: RequestContext, raw: Value| {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let input: D::Input = serde_json::from_value(raw).map_err(|e| {
                    RpcError::bad_request(format!("Invalid input for {}: {}", D::path(), e))
                })?;
                D::validate(&input).map_err(RpcError::bad_request)?;
                let output = (*handler)(ctx, input).await?;
                serde_json::to_value(output).map_err(|e| {
                    RpcError::internal(format!("Failed to serialize {} output: {}", D::path(), e))
                })
            }) as HandlerFuture
        });

        Self {
            kind: D::KIND,
            handler: erased,
            contract_group: Some(D::GROUP),
        }
    }

    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// Run the handler. Does not check the procedure kind; see `Router::call`.
    pub async fn invoke(&self, ctx: RequestContext, input: Value) -> Result<Value, RpcError> {
        (self.handler)(ctx, input).await
    }
}
