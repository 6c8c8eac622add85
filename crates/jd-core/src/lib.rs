// crates/jd-core/src/lib.rs
//
// jd-core: Core types, procedure registry, router and RPC contract for the JD app.
//
// This is the leaf crate that every other crate in the workspace depends on.
// It defines the procedure and router types, the static API contract shared by
// server and client, the batched wire format, the error taxonomy and the
// validated environment schema.

pub mod api;
pub mod context;
pub mod env;
pub mod error;
pub mod procedure;
pub mod router;
pub mod session;
pub mod traits;
pub mod wire;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use jd_core::Router;`

// Procedure and router types
pub use procedure::{Procedure, ProcedureDef, ProcedureKind};
pub use router::{ProcedureGroup, Router, RouterBuilder, RouterError};

// Request and session types
pub use context::RequestContext;
pub use session::{Session, SessionUser};

// Environment
pub use env::{ClientEnv, ConfigError, Mode, ServerEnv};

// Error types
pub use error::{ErrorCode, RpcError};

// Traits
pub use traits::IdentityProvider;
