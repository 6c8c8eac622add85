// crates/jd-rpc/src/handlers/mod.rs
//
// Handler modules for the application router.
// Each module defines handler functions for one procedure group and a
// constructor for the group itself.

pub mod example;
pub mod session;
