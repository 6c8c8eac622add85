// crates/jd-cli/src/commands/mod.rs
//
// Command module declarations for the JD CLI, plus the connection state every
// command shares.

pub mod hello;
pub mod home;
pub mod routes;
pub mod session;
pub mod sign_out;

use jd_client::{rpc_url, AuthClient, HttpBatchLink, LinkConfig, QueryClient};

use crate::output::OutputFormat;

/// Where the app lives and who the caller is.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub app_url: String,
    pub cookie: Option<String>,
    pub format: OutputFormat,
}

impl AppContext {
    /// One query cache per invocation; every page shares it.
    pub fn query_client(&self) -> QueryClient {
        let mut config = LinkConfig::new(rpc_url(&self.app_url));
        if let Some(cookie) = &self.cookie {
            config = config.with_header("cookie", cookie.clone());
        }
        QueryClient::new(HttpBatchLink::with_reqwest(config))
    }

    pub fn auth_client(&self) -> AuthClient {
        AuthClient::new(self.app_url.clone())
    }
}
