// crates/jd-rpc/src/handlers/session.rs
//
// `session` group: forwards the request context to the identity provider.

use std::sync::Arc;

use chrono::Utc;

use jd_core::api::session::GetSession;
use jd_core::{IdentityProvider, ProcedureGroup, RequestContext, RpcError, Session};

/// Handle `session.getSession`.
///
/// A logged-out caller, or a session the provider reports as already expired,
/// yields `None`. Provider failures propagate as integration errors.
pub async fn handle_get_session(
    provider: &dyn IdentityProvider,
    ctx: RequestContext,
) -> Result<Option<Session>, RpcError> {
    match provider.get_session(&ctx).await {
        Ok(Some(session)) if session.is_expired_at(Utc::now()) => {
            tracing::debug!(request_id = %ctx.request_id, "Provider returned an expired session");
            Ok(None)
        }
        Ok(session) => {
            tracing::debug!(
                request_id = %ctx.request_id,
                logged_in = session.is_some(),
                "Session lookup complete"
            );
            Ok(session)
        }
        Err(e) => {
            tracing::warn!(request_id = %ctx.request_id, "Session lookup failed: {}", e);
            Err(e)
        }
    }
}

/// The `session` procedure group.
pub fn session_group(provider: Arc<dyn IdentityProvider>) -> ProcedureGroup {
    ProcedureGroup::new("session").procedure::<GetSession, _, _>(move |ctx, ()| {
        let provider = Arc::clone(&provider);
        async move { handle_get_session(provider.as_ref(), ctx).await }
    })
}
