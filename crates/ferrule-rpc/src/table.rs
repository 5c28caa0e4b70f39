// crates/ferrule-rpc/src/table.rs
//
// The routing table produced by the router compiler.
//
// Endpoints are grouped by routing-group name and addressed by a dotted path
// `group.endpoint`. Each compiled endpoint owns its frozen middleware chain
// and terminal stage, so invoking it needs nothing but a context and an
// input value.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use ferrule_core::{
    EndpointKind, Meta, Middleware, Next, Reply, Request, RpcError, RpcResult, Subscription,
    Terminal,
};

// ---------------------------------------------------------------------------
// CompiledEndpoint
// ---------------------------------------------------------------------------

/// One callable endpoint with its middleware chain fixed at compile time.
pub struct CompiledEndpoint<C> {
    kind: EndpointKind,
    path: String,
    meta: Meta,
    chain: Arc<[Middleware<C>]>,
    terminal: Terminal<C>,
}

impl<C> Clone for CompiledEndpoint<C> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            path: self.path.clone(),
            meta: self.meta.clone(),
            chain: self.chain.clone(),
            terminal: self.terminal.clone(),
        }
    }
}

impl<C> fmt::Debug for CompiledEndpoint<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledEndpoint")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("meta", &self.meta)
            .field("chain", &self.chain)
            .finish()
    }
}

impl<C: Send + Sync + 'static> CompiledEndpoint<C> {
    pub(crate) fn new(
        kind: EndpointKind,
        path: String,
        meta: Meta,
        chain: Vec<Middleware<C>>,
        terminal: Terminal<C>,
    ) -> Self {
        Self {
            kind,
            path,
            meta,
            chain: chain.into(),
            terminal,
        }
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Dotted path, e.g. `users.getById`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Names of the chain stages in execution order.
    pub fn chain_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(Middleware::name).collect()
    }

    /// Run the chain and the handler for one call.
    pub async fn invoke(&self, ctx: Arc<C>, input: Value) -> RpcResult<Reply> {
        let req = Request {
            kind: self.kind,
            path: self.path.clone(),
            ctx,
            input,
        };
        Next::new(self.chain.clone(), self.terminal.clone())
            .run(req)
            .await
    }

    pub fn describe(&self) -> EndpointDescriptor {
        EndpointDescriptor {
            path: self.path.clone(),
            kind: self.kind,
            meta: self.meta.clone(),
            middlewares: self.chain_names(),
        }
    }
}

/// Serializable summary of one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointDescriptor {
    pub path: String,
    pub kind: EndpointKind,
    pub meta: Meta,
    pub middlewares: Vec<&'static str>,
}

// ---------------------------------------------------------------------------
// RoutingGroup
// ---------------------------------------------------------------------------

/// The endpoints of one routing group, keyed by exposed name.
pub struct RoutingGroup<C> {
    endpoints: BTreeMap<String, CompiledEndpoint<C>>,
}

impl<C> Default for RoutingGroup<C> {
    fn default() -> Self {
        Self {
            endpoints: BTreeMap::new(),
        }
    }
}

impl<C> fmt::Debug for RoutingGroup<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.endpoints.iter()).finish()
    }
}

impl<C> RoutingGroup<C> {
    pub fn get(&self, name: &str) -> Option<&CompiledEndpoint<C>> {
        self.endpoints.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.endpoints.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CompiledEndpoint<C>)> {
        self.endpoints.iter().map(|(name, ep)| (name.as_str(), ep))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Insert an endpoint. Returns the endpoint back when the name is taken.
    pub(crate) fn insert(
        &mut self,
        name: String,
        endpoint: CompiledEndpoint<C>,
    ) -> Result<(), CompiledEndpoint<C>> {
        if self.endpoints.contains_key(&name) {
            return Err(endpoint);
        }
        self.endpoints.insert(name, endpoint);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RoutingTable
// ---------------------------------------------------------------------------

/// Group name to routing group.
pub struct RoutingTable<C> {
    groups: BTreeMap<String, RoutingGroup<C>>,
}

impl<C> Default for RoutingTable<C> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<C> fmt::Debug for RoutingTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.groups.iter()).finish()
    }
}

impl<C> RoutingTable<C> {
    pub fn group(&self, name: &str) -> Option<&RoutingGroup<C>> {
        self.groups.get(name)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn endpoint(&self, group: &str, name: &str) -> Option<&CompiledEndpoint<C>> {
        self.groups.get(group).and_then(|g| g.get(name))
    }

    /// Look up an endpoint by dotted path (`group.endpoint`).
    pub fn resolve(&self, path: &str) -> Option<&CompiledEndpoint<C>> {
        let (group, name) = path.split_once('.')?;
        self.endpoint(group, name)
    }

    /// Total number of endpoints across all groups.
    pub fn len(&self) -> usize {
        self.groups.values().map(RoutingGroup::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn group_mut(&mut self, name: &str) -> &mut RoutingGroup<C> {
        self.groups.entry(name.to_string()).or_default()
    }
}

impl<C: Send + Sync + 'static> RoutingTable<C> {
    /// Every endpoint, sorted by path.
    pub fn describe(&self) -> Vec<EndpointDescriptor> {
        self.groups
            .values()
            .flat_map(|group| group.endpoints.values())
            .map(CompiledEndpoint::describe)
            .collect()
    }

    /// A server-side caller bound to one context.
    pub fn caller(self: Arc<Self>, ctx: C) -> Caller<C> {
        Caller {
            table: self,
            ctx: Arc::new(ctx),
        }
    }
}

// ---------------------------------------------------------------------------
// Caller
// ---------------------------------------------------------------------------

/// Invokes endpoints in-process with a fixed context.
pub struct Caller<C> {
    table: Arc<RoutingTable<C>>,
    ctx: Arc<C>,
}

impl<C> Clone for Caller<C> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

impl<C: Send + Sync + 'static> Caller<C> {
    pub fn context(&self) -> &Arc<C> {
        &self.ctx
    }

    /// Invoke any endpoint and return its raw reply.
    pub async fn invoke(&self, path: &str, input: Value) -> RpcResult<Reply> {
        let endpoint = self
            .table
            .resolve(path)
            .ok_or_else(|| RpcError::NotFound(path.to_string()))?;
        endpoint.invoke(self.ctx.clone(), input).await
    }

    /// Invoke a query or mutation and return its JSON result.
    pub async fn call(&self, path: &str, input: Value) -> RpcResult<Value> {
        match self.invoke(path, input).await? {
            Reply::Value(value) => Ok(value),
            Reply::Subscription(_) => Err(RpcError::Unsupported(format!(
                "{} is a subscription; use subscribe",
                path
            ))),
        }
    }

    /// Invoke a subscription and return the live event stream.
    pub async fn subscribe(&self, path: &str, input: Value) -> RpcResult<Subscription> {
        match self.invoke(path, input).await? {
            Reply::Subscription(subscription) => Ok(subscription),
            Reply::Value(_) => Err(RpcError::Unsupported(format!(
                "{} does not produce a subscription",
                path
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrule_core::BoxFuture;
    use serde_json::json;

    fn echo(kind: EndpointKind, path: &str) -> CompiledEndpoint<()> {
        let terminal: Terminal<()> =
            Arc::new(|req: Request<()>| -> BoxFuture<'static, RpcResult<Reply>> {
                Box::pin(async move { Ok(Reply::Value(req.input)) })
            });
        CompiledEndpoint::new(kind, path.to_string(), Meta::new(), Vec::new(), terminal)
    }

    fn table() -> RoutingTable<()> {
        let mut table = RoutingTable::default();
        table
            .group_mut("math")
            .insert("echo".to_string(), echo(EndpointKind::Query, "math.echo"))
            .unwrap();
        table
    }

    #[test]
    fn test_resolve_dotted_path() {
        let table = table();
        assert!(table.resolve("math.echo").is_some());
        assert!(table.resolve("math.missing").is_none());
        assert!(table.resolve("mathecho").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_group_insert_rejects_duplicate() {
        let mut table = table();
        let duplicate = table
            .group_mut("math")
            .insert("echo".to_string(), echo(EndpointKind::Query, "math.echo"));
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_caller_call_and_not_found() {
        let caller = Arc::new(table()).caller(());
        assert_eq!(caller.call("math.echo", json!(4)).await.unwrap(), json!(4));
        let err = caller.call("math.nope", json!(4)).await.unwrap_err();
        assert!(matches!(err, RpcError::NotFound(_)));
    }

    #[test]
    fn test_describe_lists_endpoints() {
        let described = table().describe();
        assert_eq!(described.len(), 1);
        assert_eq!(described[0].path, "math.echo");
        assert_eq!(described[0].kind, EndpointKind::Query);
    }
}
