//! Rate Limiting Infrastructure
//!
//! In-memory sliding-window rate limiter keyed by caller identity.
//! Attempts are kept as per-key timestamp ledgers; only attempts inside
//! the trailing window count toward the limit.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Policy
// ============================================================================

/// Rate limit policy
///
/// Bounds one class of protected operation: at most `max_attempts`
/// attempts per key within the trailing `window`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    max_attempts: u32,
    window: Duration,
}

impl Default for RateLimitPolicy {
    /// 10 attempts per 60 seconds.
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window: Duration::from_secs(60),
        }
    }
}

/// Policy construction error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    /// A zero attempt limit would deny everything
    #[error("max_attempts must be greater than zero")]
    ZeroMaxAttempts,
    /// An empty window would allow everything
    #[error("window must be greater than zero")]
    ZeroWindow,
}

impl RateLimitPolicy {
    /// Create a validated policy.
    ///
    /// # Errors
    /// Returns [`RateLimitError`] when `max_attempts` is zero or `window`
    /// is empty. Misconfiguration surfaces here, at construction, rather
    /// than silently at check time.
    pub fn new(max_attempts: u32, window: Duration) -> Result<Self, RateLimitError> {
        if max_attempts == 0 {
            return Err(RateLimitError::ZeroMaxAttempts);
        }
        if window.is_zero() {
            return Err(RateLimitError::ZeroWindow);
        }
        Ok(Self {
            max_attempts,
            window,
        })
    }

    /// Convenience constructor taking the window in whole seconds.
    pub fn per_seconds(max_attempts: u32, window_secs: u64) -> Result<Self, RateLimitError> {
        Self::new(max_attempts, Duration::from_secs(window_secs))
    }

    /// Maximum attempts allowed inside one window.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sliding window length.
    pub fn window(&self) -> Duration {
        self.window
    }
}

// ============================================================================
// Decision
// ============================================================================

/// Rate limit check result
///
/// Metadata an embedder can surface as response headers or log fields.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitDecision {
    /// Whether the attempt was admitted (and recorded)
    pub allowed: bool,
    /// Attempts left in the current window after this decision
    pub remaining: u32,
    /// Time until the oldest recorded attempt leaves the window; only
    /// populated on denial
    pub retry_after: Option<Duration>,
}

// ============================================================================
// Limiter
// ============================================================================

/// In-memory sliding-window rate limiter
///
/// Keys are opaque caller identities (client IP, account id, form name).
/// A single table mutex keeps check-then-record atomic per key; each
/// critical section walks only one key's ledger.
#[derive(Debug, Default)]
pub struct RateLimiter {
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    /// Create an empty limiter.
    pub fn new() -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether `key` may attempt now, recording the attempt if so.
    ///
    /// Denied attempts are not recorded, so a throttled caller cannot
    /// extend its own lockout by retrying.
    pub fn can_attempt(&self, key: &str, policy: &RateLimitPolicy) -> bool {
        self.check_at(key, policy, Instant::now()).allowed
    }

    /// Like [`RateLimiter::can_attempt`], returning full decision metadata.
    pub fn check(&self, key: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        self.check_at(key, policy, Instant::now())
    }

    fn check_at(&self, key: &str, policy: &RateLimitPolicy, now: Instant) -> RateLimitDecision {
        let mut table = self.lock();
        let ledger = table.entry(key.to_string()).or_default();
        prune(ledger, policy.window, now);

        let count = ledger.len() as u32;
        if count < policy.max_attempts {
            ledger.push(now);
            RateLimitDecision {
                allowed: true,
                remaining: policy.max_attempts - count - 1,
                retry_after: None,
            }
        } else {
            let retry_after = ledger
                .first()
                .map(|oldest| policy.window.saturating_sub(now.duration_since(*oldest)));
            tracing::warn!(
                key,
                max_attempts = policy.max_attempts,
                "rate limit exceeded"
            );
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after,
            }
        }
    }

    /// Clear every recorded attempt for `key`.
    ///
    /// Call after a successful operation so earlier failures stop
    /// counting against the caller.
    pub fn reset(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drop attempts older than `horizon` and remove keys left empty.
    ///
    /// Run periodically from a maintenance task; evaluation alone never
    /// removes a key, so long-idle entries persist until this sweep.
    /// Returns the number of keys removed.
    pub fn cleanup(&self, horizon: Duration) -> usize {
        self.cleanup_at(horizon, Instant::now())
    }

    fn cleanup_at(&self, horizon: Duration, now: Instant) -> usize {
        let mut table = self.lock();
        let before = table.len();
        table.retain(|_, ledger| {
            prune(ledger, horizon, now);
            !ledger.is_empty()
        });
        let removed = before - table.len();
        if removed > 0 {
            tracing::debug!(removed, "rate limiter cleanup removed stale keys");
        }
        removed
    }

    /// Number of keys currently holding at least one recorded attempt.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    // Recover the map from a poisoned lock; the ledger stays valid even
    // if a holder panicked mid-update.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drop ledger entries that have fallen out of the window.
fn prune(ledger: &mut Vec<Instant>, window: Duration, now: Instant) {
    ledger.retain(|at| now.duration_since(*at) < window);
}
