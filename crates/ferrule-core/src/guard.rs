// crates/ferrule-core/src/guard.rs
//
// Authorization guards: predicates over the request context.

use std::fmt;
use std::future::{self, Future};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::BoxFuture;

/// The decision a guard reaches about a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardOutcome {
    Allow,
    Unauthorized,
    Forbidden,
}

impl From<bool> for GuardOutcome {
    /// `true` allows; `false` is treated as unauthenticated.
    fn from(allowed: bool) -> Self {
        if allowed {
            GuardOutcome::Allow
        } else {
            GuardOutcome::Unauthorized
        }
    }
}

type GuardFn<C> = dyn Fn(Arc<C>) -> BoxFuture<'static, GuardOutcome> + Send + Sync;

/// An authorization check evaluated before the handler runs.
pub struct AuthGuard<C> {
    name: &'static str,
    inner: Arc<GuardFn<C>>,
}

impl<C> Clone for AuthGuard<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: self.inner.clone(),
        }
    }
}

impl<C> fmt::Debug for AuthGuard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGuard").field("name", &self.name).finish()
    }
}

impl<C: Send + Sync + 'static> AuthGuard<C> {
    /// A synchronous guard. Anything convertible into a [`GuardOutcome`]
    /// (including `bool`) may be returned.
    pub fn new<F, O>(f: F) -> Self
    where
        F: Fn(&C) -> O + Send + Sync + 'static,
        O: Into<GuardOutcome>,
    {
        Self {
            name: "anonymous",
            inner: Arc::new(move |ctx: Arc<C>| -> BoxFuture<'static, GuardOutcome> {
                let outcome = f(&ctx).into();
                Box::pin(future::ready(outcome))
            }),
        }
    }

    /// A guard that may suspend, e.g. to look up a session.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GuardOutcome> + Send + 'static,
    {
        Self {
            name: "anonymous",
            inner: Arc::new(move |ctx: Arc<C>| -> BoxFuture<'static, GuardOutcome> {
                Box::pin(f(ctx))
            }),
        }
    }

    /// Name shown in logs when this guard denies a call.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Evaluate the guard against a context.
    pub async fn check(&self, ctx: Arc<C>) -> GuardOutcome {
        (self.inner)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Session {
        role: Option<&'static str>,
    }

    #[tokio::test]
    async fn test_bool_guard() {
        let guard = AuthGuard::new(|s: &Session| s.role.is_some());
        assert_eq!(
            guard.check(Arc::new(Session { role: Some("user") })).await,
            GuardOutcome::Allow
        );
        assert_eq!(
            guard.check(Arc::new(Session { role: None })).await,
            GuardOutcome::Unauthorized
        );
    }

    #[tokio::test]
    async fn test_async_guard() {
        let guard = AuthGuard::from_async(|s: Arc<Session>| async move {
            tokio::task::yield_now().await;
            if s.role == Some("admin") {
                GuardOutcome::Allow
            } else {
                GuardOutcome::Forbidden
            }
        })
        .named("admin");
        assert_eq!(guard.name(), "admin");
        assert_eq!(
            guard.check(Arc::new(Session { role: Some("user") })).await,
            GuardOutcome::Forbidden
        );
    }
}
