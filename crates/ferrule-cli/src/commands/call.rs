// crates/ferrule-cli/src/commands/call.rs
//
// `ferrule call <method> [params]`: invoke one endpoint and print its result.

use clap::Args;

use crate::output::{format_json, OutputFormat};
use crate::rpc_client::{rpc_call, Identity};

/// Invoke a query or mutation by dotted path.
#[derive(Debug, Args)]
pub struct CallCmd {
    /// Endpoint path, e.g. `users.getById`.
    #[arg()]
    pub method: String,

    /// JSON-encoded input for the endpoint.
    #[arg(default_value = "null")]
    pub params: String,
}

/// Run the call command.
pub async fn run(
    cmd: &CallCmd,
    endpoint: &str,
    identity: &Identity,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let params: serde_json::Value = serde_json::from_str(&cmd.params)
        .map_err(|e| format!("params must be valid JSON: {}", e))?;

    let response = rpc_call(endpoint, &cmd.method, params, identity).await?;
    if format == OutputFormat::Json {
        println!("{}", format_json(&response));
        return Ok(());
    }

    match response.into_result() {
        Ok(value) => {
            println!("{}", format_json(&value));
            Ok(())
        }
        Err(message) => Err(message.into()),
    }
}
