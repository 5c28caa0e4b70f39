// crates/ferrule-rpc/src/middleware.rs
//
// Built-in middlewares: the tonic logging interceptor for the transport, and
// a per-endpoint logging stage for compiled chains.

use std::time::Instant;

use ferrule_core::{Middleware, Next, Request};

/// Logging interceptor for tonic requests.
///
/// Logs the metadata of each incoming request using the `tracing` crate.
pub fn logging_interceptor(
    req: tonic::Request<()>,
) -> Result<tonic::Request<()>, tonic::Status> {
    tracing::debug!("Incoming RPC request: {:?}", req.metadata());
    Ok(req)
}

/// Middleware logging `[kind] path` with the call's duration and outcome.
pub fn logging<C: Send + Sync + 'static>() -> Middleware<C> {
    Middleware::new(|req: Request<C>, next: Next<C>| async move {
        let kind = req.kind;
        let path = req.path.clone();
        let started = Instant::now();

        let result = next.run(req).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => tracing::info!("[{}] {} ok in {:?}", kind, path, elapsed),
            Err(e) => tracing::info!(
                "[{}] {} failed in {:?}: {} ({})",
                kind,
                path,
                elapsed,
                e,
                e.code()
            ),
        }
        result
    })
    .named("logging")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ferrule_core::{BoxFuture, EndpointKind, Reply, RpcError, RpcResult, Terminal};
    use serde_json::json;

    #[tokio::test]
    async fn test_logging_passes_result_through() {
        let terminal: Terminal<()> =
            Arc::new(|_req: Request<()>| -> BoxFuture<'static, RpcResult<Reply>> {
                Box::pin(async { Err(RpcError::Forbidden) })
            });
        let next = Next::new(vec![logging::<()>()].into(), terminal);
        let req = Request {
            kind: EndpointKind::Mutation,
            path: "users.create".to_string(),
            ctx: Arc::new(()),
            input: json!({}),
        };
        assert!(matches!(next.run(req).await, Err(RpcError::Forbidden)));
    }

    #[test]
    fn test_interceptor_passes_request() {
        let req = tonic::Request::new(());
        assert!(logging_interceptor(req).is_ok());
    }
}
