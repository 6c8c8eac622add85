// crates/jd-core/src/api/mod.rs
//
// The application router's contract. Each procedure is a unit type
// implementing `ProcedureDef`; the server registers handlers against these
// types and the client calls through them, so both sides agree on paths,
// kinds, inputs and outputs at compile time.

pub mod example;
pub mod session;

use serde::Serialize;

use crate::procedure::{ProcedureDef, ProcedureKind};

/// One row of the contract listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractEntry {
    pub path: String,
    pub kind: ProcedureKind,
}

impl ContractEntry {
    pub fn of<D: ProcedureDef>() -> Self {
        Self {
            path: D::path(),
            kind: D::KIND,
        }
    }
}

/// Every procedure of the application router.
pub fn contract() -> Vec<ContractEntry> {
    vec![
        ContractEntry::of::<example::Hello>(),
        ContractEntry::of::<example::Random>(),
        ContractEntry::of::<session::GetSession>(),
    ]
}
