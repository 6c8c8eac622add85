// crates/jd-rpc/src/middleware.rs
//
// Middleware for the RPC server: request logging interceptor and header
// extraction for request contexts.

use tonic::{Request, Status};

/// Logging interceptor for incoming HTTP requests.
///
/// Logs the user agent and whether credentials are attached. Cookie values are
/// never logged.
pub fn logging_interceptor(req: Request<()>) -> Result<Request<()>, Status> {
    let metadata = req.metadata();
    let user_agent = metadata
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info!(
        user_agent,
        has_cookie = metadata.get("cookie").is_some(),
        "Incoming RPC request"
    );
    Ok(req)
}

/// Convert an HTTP header map into owned name/value pairs.
///
/// Values that are not visible ASCII are skipped.
pub fn header_pairs(headers: &http::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{HeaderValue, COOKIE, USER_AGENT};

    #[test]
    fn test_header_pairs_skips_opaque_values() {
        let mut headers = http::HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("jd/0.1"));
        headers.insert(COOKIE, HeaderValue::from_bytes(b"a=\xff").unwrap());
        let pairs = header_pairs(&headers);
        assert_eq!(pairs, vec![("user-agent".to_string(), "jd/0.1".to_string())]);
    }

    #[test]
    fn test_interceptor_passes_request_through() {
        let req = Request::new(());
        assert!(logging_interceptor(req).is_ok());
    }
}
