// crates/ferrule-cli/src/main.rs
//
// CLI entrypoint for talking to a running Ferrule daemon.

mod commands;
mod output;
mod rpc_client;

use clap::{Parser, Subcommand};
use commands::call::CallCmd;
use output::OutputFormat;
use rpc_client::Identity;

/// Ferrule CLI: call endpoints and inspect a daemon's routing table.
#[derive(Parser, Debug)]
#[command(name = "ferrule", version = "0.1.0", about = "Ferrule RPC command-line client")]
struct Cli {
    /// RPC endpoint for the ferrule-daemon.
    #[arg(long, global = true, default_value = "http://localhost:50051")]
    rpc: String,

    /// User id sent with each request.
    #[arg(long, global = true)]
    user_id: Option<String>,

    /// Role sent with each request (`user` or `admin`).
    #[arg(long, global = true)]
    role: Option<String>,

    /// Print raw JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Invoke a query or mutation.
    Call(CallCmd),

    /// List the endpoints the daemon exposes.
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let identity = Identity {
        user_id: cli.user_id.clone(),
        role: cli.role.clone(),
    };
    let format = OutputFormat::from_flag(cli.json);

    match &cli.command {
        Commands::Call(cmd) => commands::call::run(cmd, &cli.rpc, &identity, format).await?,
        Commands::Routes => commands::routes::run(&cli.rpc, &identity, format).await?,
    }

    Ok(())
}
