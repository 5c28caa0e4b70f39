// crates/ferrule-rpc/src/auth.rs
//
// Guard evaluation for compiled endpoints.

use std::sync::Arc;

use ferrule_core::{AuthGuard, GuardOutcome, Middleware, Next, Request, RpcError};

/// Run `guards` in order, stopping at the first one that does not allow.
///
/// A `Forbidden` outcome maps to `RpcError::Forbidden`; any other denial is
/// reported as `RpcError::Unauthorized`.
pub async fn evaluate<C: Send + Sync + 'static>(
    guards: &[AuthGuard<C>],
    ctx: &Arc<C>,
) -> Result<(), RpcError> {
    for guard in guards {
        match guard.check(ctx.clone()).await {
            GuardOutcome::Allow => continue,
            GuardOutcome::Forbidden => {
                tracing::debug!("Guard '{}' denied access (forbidden)", guard.name());
                return Err(RpcError::Forbidden);
            }
            GuardOutcome::Unauthorized => {
                tracing::debug!("Guard '{}' denied access (unauthorized)", guard.name());
                return Err(RpcError::Unauthorized);
            }
        }
    }
    Ok(())
}

/// Middleware that evaluates `guards` and proceeds only when all allow.
pub fn auth_middleware<C: Send + Sync + 'static>(guards: Vec<AuthGuard<C>>) -> Middleware<C> {
    let guards: Arc<[AuthGuard<C>]> = guards.into();
    Middleware::new(move |req: Request<C>, next: Next<C>| {
        let guards = guards.clone();
        async move {
            evaluate(&guards, &req.ctx).await?;
            next.run(req).await
        }
    })
    .named("auth")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Session {
        user: Option<&'static str>,
        admin: bool,
    }

    fn authenticated() -> AuthGuard<Session> {
        AuthGuard::new(|s: &Session| s.user.is_some()).named("authenticated")
    }

    fn admin() -> AuthGuard<Session> {
        AuthGuard::new(|s: &Session| {
            if s.admin {
                GuardOutcome::Allow
            } else {
                GuardOutcome::Forbidden
            }
        })
        .named("admin")
    }

    #[tokio::test]
    async fn test_all_guards_allow() {
        let ctx = Arc::new(Session {
            user: Some("u1"),
            admin: true,
        });
        assert!(evaluate(&[authenticated(), admin()], &ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_outcomes_map_to_errors() {
        let anonymous = Arc::new(Session {
            user: None,
            admin: false,
        });
        let user = Arc::new(Session {
            user: Some("u1"),
            admin: false,
        });
        let guards = [authenticated(), admin()];

        assert!(matches!(
            evaluate(&guards, &anonymous).await,
            Err(RpcError::Unauthorized)
        ));
        assert!(matches!(
            evaluate(&guards, &user).await,
            Err(RpcError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_evaluation_stops_at_first_denial() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = calls.clone();
            AuthGuard::new(move |_: &Session| {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            })
        };
        let ctx = Arc::new(Session {
            user: None,
            admin: false,
        });

        assert!(evaluate(&[authenticated(), counted], &ctx).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_guard_list_allows() {
        let ctx = Arc::new(Session {
            user: None,
            admin: false,
        });
        assert!(evaluate::<Session>(&[], &ctx).await.is_ok());
    }
}
