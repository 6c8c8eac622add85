// crates/jd-rpc/src/identity.rs
//
// AuthJsProvider: reads sessions from an Auth.js-compatible REST endpoint.
//
// The provider owns sessions. We forward the caller's cookie header to
// `<auth url>/session` and interpret the JSON body; nothing is cached.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE};
use serde_json::Value;

use jd_core::{IdentityProvider, RequestContext, RpcError, ServerEnv, Session};

const SERVICE: &str = "identity provider";

/// HTTP identity provider client.
#[derive(Debug, Clone)]
pub struct AuthJsProvider {
    /// Base of the provider's REST routes, e.g. `https://app.example.com/api/auth`.
    base_url: String,
    /// Shared reqwest client for all session lookups.
    client: reqwest::Client,
}

impl AuthJsProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Provider at `AUTH_URL`, or `<BASE_URL>/api/auth` when unset.
    pub fn from_env(env: &ServerEnv) -> Self {
        Self::new(env.auth_base_url())
    }

    pub fn session_url(&self) -> String {
        format!("{}/session", self.base_url)
    }
}

#[async_trait]
impl IdentityProvider for AuthJsProvider {
    async fn get_session(&self, ctx: &RequestContext) -> Result<Option<Session>, RpcError> {
        let mut request = self
            .client
            .get(self.session_url())
            .header(ACCEPT, "application/json");
        if let Some(cookie) = ctx.cookie_header() {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RpcError::integration(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::integration(
                SERVICE,
                format!("{} returned HTTP {}", self.session_url(), status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RpcError::integration(SERVICE, e))?;
        parse_session_body(&body)
    }
}

/// Interpret a session endpoint body.
///
/// Empty body, `null`, `{}` and objects without `user` all mean "no session".
pub fn parse_session_body(body: &str) -> Result<Option<Session>, RpcError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| RpcError::integration(SERVICE, format!("unparseable session body: {}", e)))?;

    match value {
        Value::Null => Ok(None),
        Value::Object(ref map) if map.get("user").map_or(true, Value::is_null) => Ok(None),
        Value::Object(map) => serde_json::from_value(Value::Object(map))
            .map(Some)
            .map_err(|e| RpcError::integration(SERVICE, format!("unexpected session payload: {}", e))),
        _ => Err(RpcError::integration(SERVICE, "session body is not an object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jd_core::wire::HttpMethod;
    use jd_core::ErrorCode;

    #[test]
    fn test_absent_session_bodies() {
        for body in ["", "null", "{}", "{\"user\":null}", "  null  "] {
            assert!(parse_session_body(body).unwrap().is_none(), "body {:?}", body);
        }
    }

    #[test]
    fn test_session_body() {
        let session = parse_session_body(
            r#"{"user":{"id":"42","name":"Ada","email":null,"image":null},"expires":"2030-01-01T00:00:00.000Z"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(session.user_id(), Some("42"));
        assert_eq!(session.display_name(), Some("Ada"));
    }

    #[test]
    fn test_garbage_body_is_integration_error() {
        let err = parse_session_body("<html>502</html>").unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalServerError);
        let err = parse_session_body("[1]").unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalServerError);
    }

    #[test]
    fn test_session_url() {
        let provider = AuthJsProvider::new("http://localhost:3000/api/auth/");
        assert_eq!(provider.session_url(), "http://localhost:3000/api/auth/session");
    }

    #[tokio::test]
    async fn test_unreachable_provider_fails_with_integration_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let provider = AuthJsProvider::new("http://127.0.0.1:9/api/auth");
        let err = provider
            .get_session(&RequestContext::anonymous(HttpMethod::Get))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalServerError);
        assert!(err.message.starts_with("identity provider unavailable"));
    }
}
