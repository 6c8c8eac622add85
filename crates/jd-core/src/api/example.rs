// crates/jd-core/src/api/example.rs
//
// `example` group: the greeting query and the random-number mutation.

use serde::{Deserialize, Serialize};

use crate::procedure::{ProcedureDef, ProcedureKind};

/// `example.hello`: greets `name`.
#[derive(Debug)]
pub struct Hello;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloInput {
    pub name: String,
}

impl ProcedureDef for Hello {
    const GROUP: &'static str = "example";
    const NAME: &'static str = "hello";
    const KIND: ProcedureKind = ProcedureKind::Query;
    type Input = HelloInput;
    type Output = String;
}

/// `example.random`: a random number in `[0, 100)` divided by `num`.
#[derive(Debug)]
pub struct Random;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomInput {
    pub num: f64,
}

impl ProcedureDef for Random {
    const GROUP: &'static str = "example";
    const NAME: &'static str = "random";
    const KIND: ProcedureKind = ProcedureKind::Mutation;
    type Input = RandomInput;
    type Output = f64;

    fn validate(input: &RandomInput) -> Result<(), String> {
        if !input.num.is_finite() || input.num == 0.0 {
            return Err(format!("num must be a finite non-zero number, got {}", input.num));
        }
        Ok(())
    }
}
