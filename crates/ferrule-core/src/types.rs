// crates/ferrule-core/src/types.rs
//
// Plain data types shared by the declaration layer and the compiler:
// endpoint kinds, request descriptors, replies, rate-limit policies and
// parameter bindings.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;
use crate::subscription::Subscription;

/// A boxed, sendable future. Every stage of a compiled endpoint returns one.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result alias used across request-time code.
pub type RpcResult<T> = Result<T, RpcError>;

/// Free-form endpoint tags. Keys merge by shallow overwrite.
pub type Meta = BTreeMap<String, Value>;

/// The kind of a remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    #[default]
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointKind::Query => write!(f, "query"),
            EndpointKind::Mutation => write!(f, "mutation"),
            EndpointKind::Subscription => write!(f, "subscription"),
        }
    }
}

/// Deprecation marker attached to an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deprecation {
    /// Deprecated without further explanation.
    Flag,
    /// Deprecated, with a message for callers.
    Message(String),
}

impl Deprecation {
    /// The value stored under the `deprecated` meta tag.
    pub fn to_tag(&self) -> Value {
        match self {
            Deprecation::Flag => Value::Bool(true),
            Deprecation::Message(message) => Value::String(message.clone()),
        }
    }
}

/// Default scope for rate-limit policies that do not name one.
pub const DEFAULT_SCOPE_KEY: &str = "global";

/// Fixed-window rate-limit policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Counter scope. Policies without one share a process-wide window
    /// per endpoint path.
    #[serde(default)]
    pub scope_key: Option<String>,
    /// Calls allowed per window.
    pub max_points: u32,
    /// Window length in seconds.
    pub window_seconds: u64,
}

impl RateLimitPolicy {
    pub fn new(max_points: u32, window_seconds: u64) -> Self {
        Self {
            scope_key: None,
            max_points,
            window_seconds,
        }
    }

    /// Use a dedicated counter scope instead of the global one.
    pub fn scoped(mut self, scope_key: impl Into<String>) -> Self {
        self.scope_key = Some(scope_key.into());
        self
    }

    /// The scope this policy counts against.
    pub fn scope(&self) -> &str {
        self.scope_key.as_deref().unwrap_or(DEFAULT_SCOPE_KEY)
    }
}

/// Where a positional argument of a controller member comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamSource {
    Context,
    Input,
}

/// Binds one positional argument of a member to a request value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamBinding {
    pub index: usize,
    pub source: ParamSource,
}

impl ParamBinding {
    pub fn context(index: usize) -> Self {
        Self {
            index,
            source: ParamSource::Context,
        }
    }

    pub fn input(index: usize) -> Self {
        Self {
            index,
            source: ParamSource::Input,
        }
    }
}

/// The descriptor handed to every middleware stage.
pub struct Request<C> {
    pub kind: EndpointKind,
    /// Dotted endpoint path, e.g. `users.getById`.
    pub path: String,
    pub ctx: Arc<C>,
    pub input: Value,
}

impl<C> Clone for Request<C> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            path: self.path.clone(),
            ctx: self.ctx.clone(),
            input: self.input.clone(),
        }
    }
}

impl<C> fmt::Debug for Request<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("input", &self.input)
            .finish()
    }
}

/// What an endpoint produces: a JSON value, or a live subscription.
#[derive(Debug)]
pub enum Reply {
    Value(Value),
    Subscription(Subscription),
}

impl Reply {
    /// Serialize `value` into a [`Reply::Value`].
    pub fn json<T: Serialize>(value: &T) -> RpcResult<Reply> {
        Ok(Reply::Value(serde_json::to_value(value)?))
    }

    /// The JSON value, or `None` for subscriptions.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Reply::Value(value) => Some(value),
            Reply::Subscription(_) => None,
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl From<Subscription> for Reply {
    fn from(subscription: Subscription) -> Self {
        Reply::Subscription(subscription)
    }
}
