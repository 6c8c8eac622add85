// crates/jd-core/src/api/session.rs
//
// `session` group.

use crate::procedure::{ProcedureDef, ProcedureKind};
use crate::session::Session;

/// `session.getSession`: the caller's session, or `null` when logged out.
#[derive(Debug)]
pub struct GetSession;

impl ProcedureDef for GetSession {
    const GROUP: &'static str = "session";
    const NAME: &'static str = "getSession";
    const KIND: ProcedureKind = ProcedureKind::Query;
    type Input = ();
    type Output = Option<Session>;
}
