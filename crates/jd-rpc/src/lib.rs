// crates/jd-rpc/src/lib.rs
//
// jd-rpc: Batched HTTP RPC server and handlers for the JD app.
//
// Provides a tonic-hosted HTTP/1 endpoint at `/api/trpc` that decodes batched
// calls, dispatches them into the application router and encodes per-call
// results, plus the HTTP identity provider the session handler reads through.

pub mod app;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod server;

// Re-export the main server types for ergonomic access.
pub use app::app_router;
pub use identity::AuthJsProvider;
pub use server::{HttpCall, HttpReply, JdRpcServer, RpcConfig, TrpcHandler};
