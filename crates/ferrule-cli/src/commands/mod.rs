// crates/ferrule-cli/src/commands/mod.rs
//
// Command module declarations for the Ferrule CLI.

pub mod call;
pub mod routes;
