// crates/ferrule-core/src/lib.rs
//
// ferrule-core: Core types, declaration store, and controller traits for the
// Ferrule RPC compiler.
//
// This is the leaf crate of the workspace. It defines the metadata model that
// controllers populate through the declaration API, the middleware and guard
// primitives, the schema capability, and the error taxonomy. The router
// compiler itself lives in ferrule-rpc.

pub mod controller;
pub mod declare;
pub mod error;
pub mod guard;
pub mod metadata;
pub mod middleware;
pub mod schema;
pub mod store;
pub mod subscription;
pub mod types;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use ferrule_core::DeclarationStore;`

// Declarations
pub use declare::{ClassDeclaration, MethodDeclaration};
pub use metadata::{ClassMetadata, MethodMetadata, ProcedureOptions, RouterOptions};
pub use store::{ClassKey, DeclarationStore};

// Controller surface
pub use controller::{Argument, Arguments, Controller, ControllerInstance, Member};

// Request-time primitives
pub use guard::{AuthGuard, GuardOutcome};
pub use middleware::{Middleware, Next, Terminal};
pub use schema::{FnSchema, Schema, SchemaRef, SerdeSchema};
pub use subscription::Subscription;
pub use types::{
    BoxFuture, Deprecation, EndpointKind, Meta, ParamBinding, ParamSource, RateLimitPolicy,
    Reply, Request, RpcResult, DEFAULT_SCOPE_KEY,
};

// Error types
pub use error::{DefinitionError, ErrorCode, RpcError, ValidationError, ValidationTarget};

// Re-exported so controllers can implement `Controller` without a direct
// dependency on async-trait.
pub use async_trait::async_trait;
