// crates/jd-core/src/traits.rs

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::RpcError;
use crate::session::Session;

/// Trait for the external identity provider that owns sessions.
///
/// Implemented by jd-rpc (HTTP provider) and by test doubles.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up the session for the caller described by `ctx`.
    ///
    /// `Ok(None)` means nobody is logged in. `Err` is reserved for an
    /// unreachable or misconfigured provider.
    async fn get_session(&self, ctx: &RequestContext) -> Result<Option<Session>, RpcError>;
}
