// crates/ferrule-rpc/src/server.rs
//
// RPC server setup: RpcServer and RpcConfig.
//
// Uses a JSON-RPC-over-tonic approach. A single tonic service accepts a JSON
// envelope naming an endpoint path, builds the request context from the
// HTTP headers, invokes the compiled endpoint, and returns a JSON envelope.
//
// This avoids proto codegen while still using tonic's server infrastructure
// for transport and interceptors. The transport is unary, so subscription
// endpoints are rejected here; use `RoutingTable::caller` to consume them
// in-process.

use std::fmt;
use std::sync::Arc;

use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tonic::transport::Server;
use tonic::Status;

use ferrule_core::{EndpointKind, ErrorCode, Reply, RpcError};

use crate::middleware;
use crate::table::RoutingTable;

/// Reserved method returning the endpoint listing.
pub const DESCRIBE_METHOD: &str = "rpc.describe";

/// Builds the request context from the incoming HTTP headers.
pub type ContextFactory<C> = Arc<dyn Fn(&http::HeaderMap) -> C + Send + Sync>;

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Configuration for the RPC server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50051,
        }
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC Envelope
// ---------------------------------------------------------------------------

/// A JSON-RPC-style request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Dotted endpoint path (e.g., "users.getById"), or `rpc.describe`.
    pub method: String,
    /// Endpoint input. Missing params are passed as `null`.
    #[serde(default)]
    pub params: Value,
}

/// Error payload of a failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&RpcError> for RpcErrorBody {
    fn from(err: &RpcError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// A JSON-RPC-style response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// The result data (if success).
    pub result: Option<Value>,
    /// Error code and message (if not success).
    pub error: Option<RpcErrorBody>,
}

impl JsonRpcResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(err: &RpcError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(err.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// RpcServer
// ---------------------------------------------------------------------------

/// Serves a compiled routing table over tonic.
pub struct RpcServer<C> {
    config: RpcConfig,
    table: Arc<RoutingTable<C>>,
    context: ContextFactory<C>,
}

impl<C> fmt::Debug for RpcServer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcServer")
            .field("config", &self.config)
            .field("endpoints", &self.table.len())
            .finish()
    }
}

impl<C: Send + Sync + 'static> RpcServer<C> {
    pub fn new(config: RpcConfig, table: Arc<RoutingTable<C>>, context: ContextFactory<C>) -> Self {
        Self {
            config,
            table,
            context,
        }
    }

    /// Start the RPC server and listen for requests.
    ///
    /// This binds to the configured address and serves requests until
    /// the process is terminated.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        tracing::info!(
            "Ferrule RPC server starting on {} ({} endpoints)",
            addr,
            self.table.len()
        );

        Server::builder()
            .accept_http1(true)
            .add_service(tonic::service::interceptor::InterceptedService::new(
                JsonRpcService::new(self.table.clone(), self.context.clone()),
                middleware::logging_interceptor,
            ))
            .serve(addr)
            .await?;

        Ok(())
    }
}

/// Dispatch one envelope against `table`.
pub async fn dispatch<C: Send + Sync + 'static>(
    table: &RoutingTable<C>,
    ctx: Arc<C>,
    request: JsonRpcRequest,
) -> JsonRpcResponse {
    if request.method == DESCRIBE_METHOD {
        return match serde_json::to_value(table.describe()) {
            Ok(listing) => JsonRpcResponse::ok(listing),
            Err(e) => JsonRpcResponse::err(&RpcError::from(e)),
        };
    }

    let Some(endpoint) = table.resolve(&request.method) else {
        return JsonRpcResponse::err(&RpcError::NotFound(request.method));
    };

    if endpoint.kind() == EndpointKind::Subscription {
        return JsonRpcResponse::err(&RpcError::Unsupported(format!(
            "{} is a subscription and cannot be called over this transport",
            request.method
        )));
    }

    match endpoint.invoke(ctx, request.params).await {
        Ok(Reply::Value(value)) => JsonRpcResponse::ok(value),
        Ok(Reply::Subscription(_)) => JsonRpcResponse::err(&RpcError::Unsupported(format!(
            "{} produced a subscription",
            request.method
        ))),
        Err(e) => {
            tracing::debug!("{} failed: {}", request.method, e);
            JsonRpcResponse::err(&e)
        }
    }
}

// ---------------------------------------------------------------------------
// Tonic Service Wiring
// ---------------------------------------------------------------------------

/// The tonic service wrapper. Implements the low-level service by accepting
/// bytes, deserializing as JSON-RPC, and dispatching.
pub struct JsonRpcService<C> {
    table: Arc<RoutingTable<C>>,
    context: ContextFactory<C>,
}

impl<C> Clone for JsonRpcService<C> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            context: self.context.clone(),
        }
    }
}

impl<C> fmt::Debug for JsonRpcService<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcService").finish()
    }
}

impl<C> JsonRpcService<C> {
    pub fn new(table: Arc<RoutingTable<C>>, context: ContextFactory<C>) -> Self {
        Self { table, context }
    }
}

impl<C> tonic::server::NamedService for JsonRpcService<C> {
    const NAME: &'static str = "ferrule.rpc.Dispatch";
}

impl<C, B> tower_service::Service<http::Request<B>> for JsonRpcService<C>
where
    C: Send + Sync + 'static,
    B: HttpBody + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    B::Data: Send,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let table = self.table.clone();
        let ctx = Arc::new((self.context)(req.headers()));

        Box::pin(async move {
            let body_bytes = match collect_body(req.into_body()).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!("Failed to read request body: {}", e);
                    let err = RpcError::internal(format!("Failed to read request body: {}", e));
                    return Ok(build_response(&JsonRpcResponse::err(&err)));
                }
            };

            let rpc_request: JsonRpcRequest = match serde_json::from_slice(&body_bytes) {
                Ok(r) => r,
                Err(e) => {
                    let err = RpcError::invalid_input(ferrule_core::ValidationError::new(
                        format!("Invalid JSON-RPC request: {}", e),
                    ));
                    return Ok(build_response(&JsonRpcResponse::err(&err)));
                }
            };

            let rpc_response = dispatch(&table, ctx, rpc_request).await;
            Ok(build_response(&rpc_response))
        })
    }
}

/// Read the whole request body, however many frames it arrives in.
async fn collect_body<B>(body: B) -> Result<bytes::Bytes, String>
where
    B: HttpBody + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    B::Data: Send,
{
    match body.collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) => {
            let e: Box<dyn std::error::Error + Send + Sync> = e.into();
            Err(e.to_string())
        }
    }
}

/// Build an HTTP response carrying the JSON envelope.
fn build_response(envelope: &JsonRpcResponse) -> http::Response<tonic::body::BoxBody> {
    let json = serde_json::to_vec(envelope).unwrap_or_default();
    let body = tonic::body::BoxBody::new(
        http_body_util::Full::new(bytes::Bytes::from(json))
            .map_err(|e| Status::internal(format!("body error: {}", e))),
    );

    let mut response = http::Response::new(body);
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}
