//! Attempt Guard
//!
//! Composes the rate limiter and the error sanitizer around a single
//! protected operation in the fixed order the calling flows use:
//! limit check, run the operation, sanitize on failure, reset the
//! caller's ledger on success.

use std::error::Error;

use kernel::error::app_error::{AppError, AppResult};

use crate::rate_limit::{RateLimitPolicy, RateLimiter};
use crate::sanitize::{ErrorSanitizer, THROTTLED_MESSAGE};

/// Guard wrapping sensitive operations (login, registration, password
/// reset) with throttling and error sanitization.
///
/// One guard owns one [`RateLimiter`]; flows sharing a guard share its
/// attempt ledger, keyed per operation and actor.
///
/// # Examples
/// ```rust
/// use sentinel::guard::AttemptGuard;
/// use sentinel::rate_limit::RateLimitPolicy;
/// use sentinel::sanitize::ErrorSanitizer;
///
/// let guard = AttemptGuard::new(ErrorSanitizer::new());
/// let policy = RateLimitPolicy::default();
///
/// let result = guard.run("login_user@example.com", &policy, || {
///     Ok::<_, std::io::Error>("session-token")
/// });
/// assert!(result.is_ok());
/// ```
#[derive(Debug)]
pub struct AttemptGuard {
    limiter: RateLimiter,
    sanitizer: ErrorSanitizer,
}

impl Default for AttemptGuard {
    fn default() -> Self {
        Self::new(ErrorSanitizer::new())
    }
}

impl AttemptGuard {
    /// Guard with a fresh limiter and the given sanitizer.
    pub fn new(sanitizer: ErrorSanitizer) -> Self {
        Self {
            limiter: RateLimiter::new(),
            sanitizer,
        }
    }

    /// Guard whose sanitizer reads verbose mode from the environment.
    pub fn from_env() -> Self {
        Self::new(ErrorSanitizer::from_env())
    }

    /// Run `op` for `key` under `policy`.
    ///
    /// A throttled call returns 429 with [`THROTTLED_MESSAGE`] and does
    /// not invoke `op` (nor count as an attempt). A failing `op` has its
    /// error classified into a safe [`AppError`], keeping the original
    /// as source. A successful `op` clears the key's attempt history.
    pub fn run<T, E, F>(&self, key: &str, policy: &RateLimitPolicy, op: F) -> AppResult<T>
    where
        E: Error + Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        if !self.limiter.can_attempt(key, policy) {
            return Err(AppError::too_many_requests(THROTTLED_MESSAGE));
        }

        match op() {
            Ok(value) => {
                self.limiter.reset(key);
                Ok(value)
            }
            Err(err) => {
                let app = self.sanitizer.classify(&err).with_source(err);
                tracing::debug!(key, kind = %app.kind(), "guarded operation failed");
                Err(app)
            }
        }
    }

    /// Shared limiter, for maintenance calls (`cleanup`) and metrics.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Sanitizer in use, for standalone message sanitization.
    pub fn sanitizer(&self) -> &ErrorSanitizer {
        &self.sanitizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::error::kind::ErrorKind;
    use std::cell::Cell;
    use std::time::Duration;

    fn policy(max_attempts: u32) -> RateLimitPolicy {
        RateLimitPolicy::new(max_attempts, Duration::from_secs(60)).unwrap()
    }

    fn login_failure() -> std::io::Error {
        std::io::Error::other("Invalid login credentials")
    }

    #[test]
    fn test_throttles_after_exhaustion_without_running_op() {
        let guard = AttemptGuard::default();
        let p = policy(1);
        let calls = Cell::new(0u32);

        let first = guard.run("login_a", &p, || {
            calls.set(calls.get() + 1);
            Err::<(), _>(login_failure())
        });
        assert_eq!(first.unwrap_err().status_code(), 401);

        let second = guard.run("login_a", &p, || {
            calls.set(calls.get() + 1);
            Err::<(), _>(login_failure())
        });
        let err = second.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyRequests);
        assert_eq!(err.message(), THROTTLED_MESSAGE);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_success_resets_attempt_history() {
        let guard = AttemptGuard::default();
        let p = policy(2);

        let failed = guard.run("login_b", &p, || Err::<(), _>(login_failure()));
        assert!(failed.is_err());

        let ok = guard.run("login_b", &p, || Ok::<_, std::io::Error>("token"));
        assert_eq!(ok.unwrap(), "token");
        assert_eq!(guard.limiter().tracked_keys(), 0);

        // The earlier failed streak no longer counts.
        assert!(guard.run("login_b", &p, || Ok::<_, std::io::Error>(())).is_ok());
    }

    #[test]
    fn test_failure_is_sanitized_with_source() {
        let guard = AttemptGuard::default();
        let p = policy(5);

        let err = guard
            .run("register", &p, || {
                Err::<(), _>(std::io::Error::other(
                    "duplicate key value violates unique constraint \"users_email_key\"",
                ))
            })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.message(), "This record already exists.");
        assert!(!err.to_string().contains("users_email_key"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_keys_do_not_interfere() {
        let guard = AttemptGuard::default();
        let p = policy(1);

        assert!(guard.run("login_x", &p, || Err::<(), _>(login_failure())).is_err());
        // login_x is exhausted, login_y is untouched.
        assert!(guard
            .run("login_y", &p, || Ok::<_, std::io::Error>(()))
            .is_ok());
        let throttled = guard.run("login_x", &p, || Ok::<_, std::io::Error>(()));
        assert_eq!(throttled.unwrap_err().status_code(), 429);
    }
}
