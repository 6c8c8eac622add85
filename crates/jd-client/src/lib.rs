// crates/jd-client/src/lib.rs
//
// jd-client: Batching RPC client, query cache and auth helpers for the JD app.
//
// Calls go through the typed contract in `jd_core::api`: the query cache and
// link never see a procedure name the server does not also know about.

pub mod auth;
pub mod base_url;
pub mod cache;
pub mod error;
pub mod link;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use auth::AuthClient;
pub use base_url::{base_url, rpc_url, RuntimeContext};
pub use cache::{Query, QueryClient, QueryKey, QueryState};
pub use error::ClientError;
pub use link::{HttpBatchLink, LinkConfig};
pub use transport::{HttpTransport, ReqwestTransport, TransportRequest, TransportResponse};
