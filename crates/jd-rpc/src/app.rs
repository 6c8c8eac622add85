// crates/jd-rpc/src/app.rs
//
// The application router: every group of the JD app composed into one
// namespace. Its paths are exactly those of `jd_core::api::contract()`.

use std::sync::Arc;

use jd_core::{IdentityProvider, Router, RouterError};

use crate::handlers::example::example_group;
use crate::handlers::session::session_group;

/// Build the application router around the given identity provider.
pub fn app_router(identity: Arc<dyn IdentityProvider>) -> Result<Router, RouterError> {
    Router::builder()
        .group(example_group())
        .group(session_group(identity))
        .build()
}
