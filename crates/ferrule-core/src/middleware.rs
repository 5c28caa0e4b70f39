// crates/ferrule-core/src/middleware.rs
//
// Middleware chain primitives.
//
// A middleware receives the request descriptor and a `Next` handle. Calling
// `next.run(request)` proceeds to the following stage; returning without
// calling it short-circuits the rest of the chain.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::types::{BoxFuture, Reply, Request, RpcResult};

type MiddlewareFn<C> =
    dyn Fn(Request<C>, Next<C>) -> BoxFuture<'static, RpcResult<Reply>> + Send + Sync;

/// The final stage of a chain: validation plus the handler body.
pub type Terminal<C> =
    Arc<dyn Fn(Request<C>) -> BoxFuture<'static, RpcResult<Reply>> + Send + Sync>;

/// A single stage wrapped around an endpoint.
pub struct Middleware<C> {
    name: &'static str,
    inner: Arc<MiddlewareFn<C>>,
}

impl<C> Clone for Middleware<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: self.inner.clone(),
        }
    }
}

impl<C> fmt::Debug for Middleware<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").field("name", &self.name).finish()
    }
}

impl<C: Send + Sync + 'static> Middleware<C> {
    /// Wrap an async closure as a middleware.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request<C>, Next<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RpcResult<Reply>> + Send + 'static,
    {
        Self {
            name: "anonymous",
            inner: Arc::new(
                move |req: Request<C>, next: Next<C>| -> BoxFuture<'static, RpcResult<Reply>> {
                    Box::pin(f(req, next))
                },
            ),
        }
    }

    /// Name shown in debug output and logs.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run this stage.
    pub fn call(&self, req: Request<C>, next: Next<C>) -> BoxFuture<'static, RpcResult<Reply>> {
        (self.inner)(req, next)
    }
}

/// Handle to the remainder of a middleware chain.
pub struct Next<C> {
    chain: Arc<[Middleware<C>]>,
    position: usize,
    terminal: Terminal<C>,
}

impl<C: Send + Sync + 'static> Next<C> {
    /// Start of a chain: `run` will invoke `chain[0]`, or the terminal when
    /// the chain is empty.
    pub fn new(chain: Arc<[Middleware<C>]>, terminal: Terminal<C>) -> Self {
        Self {
            chain,
            position: 0,
            terminal,
        }
    }

    /// Proceed to the next stage.
    pub async fn run(self, req: Request<C>) -> RpcResult<Reply> {
        match self.chain.get(self.position).cloned() {
            Some(middleware) => {
                let next = Next {
                    chain: self.chain.clone(),
                    position: self.position + 1,
                    terminal: self.terminal.clone(),
                };
                middleware.call(req, next).await
            }
            None => (self.terminal)(req).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EndpointKind;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    fn request() -> Request<()> {
        Request {
            kind: EndpointKind::Query,
            path: "test.echo".to_string(),
            ctx: Arc::new(()),
            input: json!(1),
        }
    }

    fn echo_terminal(trace: Arc<Mutex<Vec<String>>>) -> Terminal<()> {
        Arc::new(move |req: Request<()>| -> BoxFuture<'static, RpcResult<Reply>> {
            let trace = trace.clone();
            Box::pin(async move {
                trace.lock().unwrap().push("handler".to_string());
                Ok(Reply::Value(req.input))
            })
        })
    }

    fn tracing_middleware(label: &'static str, trace: Arc<Mutex<Vec<String>>>) -> Middleware<()> {
        Middleware::new(move |req, next: Next<()>| {
            let trace = trace.clone();
            async move {
                trace.lock().unwrap().push(label.to_string());
                next.run(req).await
            }
        })
    }

    #[tokio::test]
    async fn test_empty_chain_runs_terminal() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let next = Next::new(Vec::<Middleware<()>>::new().into(), echo_terminal(trace.clone()));
        let reply = next.run(request()).await.unwrap();
        assert_eq!(reply.into_value(), Some(json!(1)));
        assert_eq!(*trace.lock().unwrap(), vec!["handler"]);
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Middleware<()>> = vec![
            tracing_middleware("a", trace.clone()),
            tracing_middleware("b", trace.clone()),
        ];
        let next = Next::new(chain.into(), echo_terminal(trace.clone()));
        next.run(request()).await.unwrap();
        assert_eq!(*trace.lock().unwrap(), vec!["a", "b", "handler"]);
    }

    #[tokio::test]
    async fn test_middleware_can_rewrite_input() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let rewrite = Middleware::new(|mut req: Request<()>, next: Next<()>| async move {
            req.input = Value::String("rewritten".to_string());
            next.run(req).await
        });
        let next = Next::new(vec![rewrite].into(), echo_terminal(trace));
        let reply = next.run(request()).await.unwrap();
        assert_eq!(reply.into_value(), Some(json!("rewritten")));
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let deny = Middleware::new(|_req: Request<()>, _next: Next<()>| async move {
            Err(crate::error::RpcError::Forbidden)
        })
        .named("deny");
        let next = Next::new(vec![deny].into(), echo_terminal(trace.clone()));
        assert!(next.run(request()).await.is_err());
        assert!(trace.lock().unwrap().is_empty());
    }
}
