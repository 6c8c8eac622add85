// crates/jd-rpc/src/handlers/example.rs
//
// `example` group handlers: hello (query) and random (mutation).

use rand::Rng;

use jd_core::api::example::{Hello, HelloInput, Random, RandomInput};
use jd_core::{ProcedureGroup, RequestContext, RpcError};

/// Handle `example.hello`.
pub async fn handle_hello(_ctx: RequestContext, input: HelloInput) -> Result<String, RpcError> {
    Ok(format!("Hello {}", input.name))
}

/// Handle `example.random`.
///
/// `num` has already been validated as finite and non-zero.
pub async fn handle_random(_ctx: RequestContext, input: RandomInput) -> Result<f64, RpcError> {
    let roll: f64 = rand::thread_rng().gen_range(0.0..100.0);
    Ok(roll / input.num)
}

/// The `example` procedure group.
pub fn example_group() -> ProcedureGroup {
    ProcedureGroup::new("example")
        .procedure::<Hello, _, _>(handle_hello)
        .procedure::<Random, _, _>(handle_random)
}
