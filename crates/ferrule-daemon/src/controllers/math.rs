// crates/ferrule-daemon/src/controllers/math.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ferrule_core::{
    Arguments, Controller, DeclarationStore, Member, ProcedureOptions, Reply, RouterOptions,
    RpcError, RpcResult, SerdeSchema,
};

use crate::app::LOGGED_PROCEDURE;
use crate::context::AppContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoubleInput {
    pub x: f64,
}

pub struct MathController;

#[async_trait]
impl Controller<AppContext> for MathController {
    fn declare(store: &mut DeclarationStore<AppContext>) {
        store
            .class::<MathController>()
            .router(Some("math"), RouterOptions::new())
            .use_base(LOGGED_PROCEDURE);

        store
            .method::<MathController>("double")
            .query(
                None,
                ProcedureOptions::new()
                    .input(SerdeSchema::<DoubleInput>::new().shared())
                    .output(SerdeSchema::<f64>::new().shared()),
            )
            .bind_context(0)
            .bind_input(1);
    }

    fn members(&self) -> Vec<Member> {
        vec![Member::new("double", 2)]
    }

    async fn invoke(&self, member: &str, args: Arguments<AppContext>) -> RpcResult<Reply> {
        match member {
            "double" => {
                let input: DoubleInput = args.input(1)?;
                Reply::json(&(input.x * 2.0))
            }
            other => Err(RpcError::NotFound(other.to_string())),
        }
    }
}
