// crates/ferrule-rpc/src/rate_limit.rs
//
// Fixed-window rate limiter shared by every rate-limited endpoint of a
// routing table.
//
// Counters are keyed by "{scope}:{path}". A window starts on the first call
// after the previous one expired and resets hard when it elapses; there is
// no smoothing across window boundaries.
//
// The check-then-update sequence runs under a mutex with no await inside,
// so the configured limit holds on multi-threaded runtimes too.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use ferrule_core::{Middleware, Next, RateLimitPolicy, Request, RpcError};

/// Expiry used when `now + window` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Counter state for one key.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    expires_at: Instant,
}

/// End of a window opened at `now`, clamped for windows too long to represent.
fn window_end(now: Instant, window_seconds: u64) -> Instant {
    now.checked_add(Duration::from_secs(window_seconds))
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Handle to a shared counter map. Clones share the same counters.
#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter with an empty counter map.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Window>> {
        // A panic while holding the lock cannot leave a window half-written.
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counter key for a policy and endpoint path.
    pub fn key(policy: &RateLimitPolicy, path: &str) -> String {
        format!("{}:{}", policy.scope(), path)
    }

    /// Spend one point of `policy`'s budget for `path`.
    ///
    /// # Errors
    /// Returns `RpcError::RateLimitExceeded` when the current window is
    /// already exhausted. The counter is left unchanged in that case.
    pub fn hit(&self, policy: &RateLimitPolicy, path: &str) -> Result<(), RpcError> {
        let key = Self::key(policy, path);
        let now = Instant::now();
        let mut windows = self.lock();

        match windows.get_mut(&key) {
            Some(window) if window.expires_at > now => {
                if window.count >= policy.max_points {
                    tracing::debug!(
                        "Rate limit exceeded for {} ({} points per {}s)",
                        key,
                        policy.max_points,
                        policy.window_seconds
                    );
                    return Err(RpcError::RateLimitExceeded {
                        path: path.to_string(),
                    });
                }
                window.count += 1;
            }
            _ => {
                windows.insert(
                    key,
                    Window {
                        count: 1,
                        expires_at: window_end(now, policy.window_seconds),
                    },
                );
            }
        }

        Ok(())
    }

    /// Middleware enforcing `policy` on the endpoint it wraps.
    pub fn middleware<C: Send + Sync + 'static>(&self, policy: RateLimitPolicy) -> Middleware<C> {
        let limiter = self.clone();
        Middleware::new(move |req: Request<C>, next: Next<C>| {
            let outcome = limiter.hit(&policy, &req.path);
            async move {
                outcome?;
                next.run(req).await
            }
        })
        .named("rate_limit")
    }

    /// Number of keys currently holding a window.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    /// Drop windows that have already expired. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, window| window.expires_at > now);
        before - windows.len()
    }
}
