// crates/ferrule-rpc/src/lib.rs
//
// ferrule-rpc: Router compiler, rate limiter, auth evaluator and JSON-RPC
// server for Ferrule.
//
// The compiler reads the declarations recorded in a ferrule-core
// DeclarationStore and freezes them, together with live controller
// instances, into a RoutingTable. The table can be called in-process through
// a Caller or served over tonic with RpcServer.

pub mod auth;
pub mod compiler;
pub mod middleware;
pub mod rate_limit;
pub mod server;
pub mod table;

// Re-export the main types for ergonomic access.
pub use auth::{auth_middleware, evaluate};
pub use compiler::{lower_camel, ProcedureTemplate, RouterCompiler};
pub use middleware::{logging, logging_interceptor};
pub use rate_limit::RateLimiter;
pub use server::{
    dispatch, ContextFactory, JsonRpcRequest, JsonRpcResponse, RpcConfig, RpcErrorBody,
    RpcServer, DESCRIBE_METHOD,
};
pub use table::{Caller, CompiledEndpoint, EndpointDescriptor, RoutingGroup, RoutingTable};
