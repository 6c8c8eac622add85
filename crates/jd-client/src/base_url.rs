// crates/jd-client/src/base_url.rs
//
// Base URL resolution for the RPC endpoint.
//
// In a browser runtime the endpoint is same-origin, so the base is empty. In a
// server runtime it comes from the deployment host (`VERCEL_URL`), falling
// back to localhost on `PORT`.

use jd_core::wire::RPC_PATH;

const DEFAULT_PORT: &str = "3000";

/// Where the client code is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeContext {
    Browser,
    Server,
}

/// Resolve the base URL for `runtime` using an environment lookup.
pub fn base_url<F>(runtime: RuntimeContext, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match runtime {
        RuntimeContext::Browser => String::new(),
        RuntimeContext::Server => match lookup("VERCEL_URL").filter(|v| !v.trim().is_empty()) {
            Some(host) if host.contains("://") => host.trim_end_matches('/').to_string(),
            Some(host) => format!("https://{}", host.trim_end_matches('/')),
            None => {
                let port = lookup("PORT").unwrap_or_else(|| DEFAULT_PORT.to_string());
                format!("http://localhost:{}", port.trim())
            }
        },
    }
}

/// Full endpoint URL for a base.
pub fn rpc_url(base: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), RPC_PATH)
}
