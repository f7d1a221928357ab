//! Demo Entry Point
//!
//! Wires the security layer into a simulated sign-in flow.
//! Uses `anyhow` for startup errors, but flow-level errors use
//! `kernel::error::AppError`.

use std::time::Duration;

use kernel::error::kind::ErrorKind;
use sentinel::guard::AttemptGuard;
use sentinel::rate_limit::RateLimitPolicy;
use sentinel::validate::{is_valid_email, is_valid_password, sanitize_input};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demo=info,sentinel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Verbose mode comes from VERBOSE_ERRORS; leave it unset outside
    // local development.
    let guard = AttemptGuard::from_env();
    let policy = RateLimitPolicy::per_seconds(3, 60)?;

    // Pre-flight validation, the way a login form would run it
    let email = sanitize_input("  alice@example.com  ");
    if !is_valid_email(&email) {
        anyhow::bail!("demo email rejected by the validator");
    }
    if !is_valid_password("Tr1cky-Passw0rd!") {
        anyhow::bail!("demo password rejected by the validator");
    }
    tracing::info!(email = %email, "credentials passed validation");

    // Simulated sign-in attempts against a failing provider: the first
    // three surface a safe 401 message, the rest are throttled
    let key = format!("login_{email}");
    for attempt in 1..=5u32 {
        let result = guard.run(&key, &policy, || {
            Err::<(), _>(std::io::Error::other("Invalid login credentials"))
        });
        match result {
            Ok(()) => tracing::info!(attempt, "signed in"),
            Err(err) if err.kind() == ErrorKind::TooManyRequests => {
                tracing::warn!(attempt, message = %err.message(), "sign-in throttled");
            }
            Err(err) => {
                tracing::info!(
                    attempt,
                    status = err.status_code(),
                    message = %err.message(),
                    "sign-in rejected"
                );
            }
        }
    }

    // After the lockout clears (forced here), a successful sign-in
    // wipes the failed streak
    guard.limiter().reset(&key);
    let token = guard.run(&key, &policy, || Ok::<_, std::io::Error>("session-token"))?;
    tracing::info!(token = %token, tracked = guard.limiter().tracked_keys(), "signed in");

    // Standalone sanitization, as used outside guarded flows
    let safe = guard
        .sanitizer()
        .sanitize_message("duplicate key value violates unique constraint \"users_email_key\"");
    tracing::info!(message = %safe, "storage failure rendered for display");

    // Periodic maintenance sweep; the embedding scheduler would run
    // this on a timer
    let removed = guard.limiter().cleanup(Duration::from_secs(3600));
    tracing::info!(removed, "rate limiter sweep completed");

    Ok(())
}
