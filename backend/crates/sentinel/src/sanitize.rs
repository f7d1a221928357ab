//! Error Sanitization
//!
//! Converts raw failures from authentication providers, data stores, and
//! network transports into fixed, safe, user-facing messages. Raw text
//! never reaches the user unless verbose diagnostics are enabled.

use std::borrow::Cow;
use std::error::Error;

use kernel::error::app_error::AppError;
use kernel::error::kind::ErrorKind;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable enabling verbose (unsanitized) error output.
///
/// Truthy values: `1`, `true`, `yes` (case-insensitive). Intended only
/// for local development; must stay unset in deployed instances.
pub const VERBOSE_ERRORS_ENV: &str = "VERBOSE_ERRORS";

/// Fallback shown when no classification rule matches
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Safe message for throttled callers
pub const THROTTLED_MESSAGE: &str = "Too many attempts. Please try again later.";

// ============================================================================
// Rules
// ============================================================================

/// One classification rule: case-insensitive substring pattern, the
/// [`ErrorKind`] it resolves to, and the safe message to surface.
#[derive(Debug, Clone)]
pub struct SanitizeRule {
    /// Stored lowercase; matched against the lowercased raw message
    pattern: Cow<'static, str>,
    kind: ErrorKind,
    message: Cow<'static, str>,
}

impl SanitizeRule {
    const fn fixed(pattern: &'static str, kind: ErrorKind, message: &'static str) -> Self {
        Self {
            pattern: Cow::Borrowed(pattern),
            kind,
            message: Cow::Borrowed(message),
        }
    }

    /// Classification this rule resolves to.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Safe message this rule surfaces.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Built-in classification table, evaluated in order; first match wins.
///
/// Covers the three failure families seen at an authentication boundary:
/// provider/auth errors, storage constraint violations, and transport
/// failures. Patterns must be lowercase.
const DEFAULT_RULES: &[SanitizeRule] = &[
    // --- Authentication provider ---
    SanitizeRule::fixed(
        "invalid login credentials",
        ErrorKind::Unauthorized,
        "Invalid email or password.",
    ),
    SanitizeRule::fixed(
        "invalid credentials",
        ErrorKind::Unauthorized,
        "Invalid email or password.",
    ),
    SanitizeRule::fixed(
        "email not confirmed",
        ErrorKind::Unauthorized,
        "Please confirm your email address before signing in.",
    ),
    SanitizeRule::fixed("too many requests", ErrorKind::TooManyRequests, THROTTLED_MESSAGE),
    SanitizeRule::fixed("rate limit", ErrorKind::TooManyRequests, THROTTLED_MESSAGE),
    SanitizeRule::fixed(
        "user not found",
        ErrorKind::NotFound,
        "No account found for that email address.",
    ),
    SanitizeRule::fixed(
        "user already registered",
        ErrorKind::Conflict,
        "An account with this email already exists.",
    ),
    SanitizeRule::fixed(
        "invalid email",
        ErrorKind::BadRequest,
        "Please enter a valid email address.",
    ),
    SanitizeRule::fixed(
        "password should be",
        ErrorKind::BadRequest,
        "Password does not meet the security requirements.",
    ),
    SanitizeRule::fixed(
        "weak password",
        ErrorKind::BadRequest,
        "Password does not meet the security requirements.",
    ),
    // --- Storage constraints ---
    SanitizeRule::fixed("duplicate key", ErrorKind::Conflict, "This record already exists."),
    SanitizeRule::fixed("unique constraint", ErrorKind::Conflict, "This record already exists."),
    SanitizeRule::fixed(
        "foreign key constraint",
        ErrorKind::BadRequest,
        "This operation references data that does not exist.",
    ),
    SanitizeRule::fixed(
        "not-null constraint",
        ErrorKind::BadRequest,
        "A required field is missing.",
    ),
    SanitizeRule::fixed(
        "violates not-null",
        ErrorKind::BadRequest,
        "A required field is missing.",
    ),
    SanitizeRule::fixed(
        "check constraint",
        ErrorKind::BadRequest,
        "One of the provided values is not allowed.",
    ),
    SanitizeRule::fixed(
        "no rows returned",
        ErrorKind::NotFound,
        "The requested record was not found.",
    ),
    // --- Transport ---
    SanitizeRule::fixed(
        "failed to fetch",
        ErrorKind::ServiceUnavailable,
        "Unable to reach the server. Please check your connection.",
    ),
    SanitizeRule::fixed(
        "networkerror",
        ErrorKind::ServiceUnavailable,
        "Unable to reach the server. Please check your connection.",
    ),
    SanitizeRule::fixed(
        "connection refused",
        ErrorKind::ServiceUnavailable,
        "Unable to reach the server. Please check your connection.",
    ),
    SanitizeRule::fixed(
        "timed out",
        ErrorKind::RequestTimeout,
        "The request took too long. Please try again.",
    ),
    SanitizeRule::fixed(
        "timeout",
        ErrorKind::RequestTimeout,
        "The request took too long. Please try again.",
    ),
];

// ============================================================================
// Sanitizer
// ============================================================================

/// Error sanitizer with an ordered first-match-wins rule table.
///
/// Configuration is fixed at startup: verbose mode comes from the
/// [`VERBOSE_ERRORS_ENV`] environment variable (or [`ErrorSanitizer::with_verbose`]),
/// and extra rules may be appended before the sanitizer is shared.
///
/// # Examples
/// ```rust
/// use sentinel::sanitize::ErrorSanitizer;
///
/// let sanitizer = ErrorSanitizer::new();
/// let safe = sanitizer.sanitize_message("duplicate key value violates unique constraint");
/// assert_eq!(safe, "This record already exists.");
/// ```
#[derive(Debug, Clone)]
pub struct ErrorSanitizer {
    rules: Vec<SanitizeRule>,
    verbose: bool,
}

impl Default for ErrorSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorSanitizer {
    /// Sanitizer with the built-in rule table, verbose mode off.
    pub fn new() -> Self {
        Self {
            rules: DEFAULT_RULES.to_vec(),
            verbose: false,
        }
    }

    /// Sanitizer with verbose mode read from [`VERBOSE_ERRORS_ENV`].
    pub fn from_env() -> Self {
        let verbose = std::env::var(VERBOSE_ERRORS_ENV)
            .map(|value| is_truthy(&value))
            .unwrap_or(false);
        if verbose {
            tracing::warn!("verbose error output enabled; raw errors will be shown");
        }
        Self::new().with_verbose(verbose)
    }

    /// Override verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Whether raw messages pass through unsanitized.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Append a rule to the end of the table.
    ///
    /// The pattern is lowercased on insertion. Built-in rules are
    /// evaluated first, so an appended rule only fires when no earlier
    /// pattern matches.
    pub fn push_rule(
        &mut self,
        pattern: impl Into<Cow<'static, str>>,
        kind: ErrorKind,
        message: impl Into<Cow<'static, str>>,
    ) {
        self.rules.push(SanitizeRule {
            pattern: Cow::Owned(pattern.into().to_lowercase()),
            kind,
            message: message.into(),
        });
    }

    /// Sanitize a raw message into a safe user-facing string.
    ///
    /// In verbose mode the raw text passes through verbatim, except that
    /// blank input still degrades to the generic fallback. Never fails.
    pub fn sanitize_message(&self, raw: &str) -> String {
        if self.verbose {
            if raw.trim().is_empty() {
                return GENERIC_ERROR_MESSAGE.to_string();
            }
            return raw.to_string();
        }
        self.resolve(raw).1
    }

    /// Sanitize any error through its `Display` message.
    pub fn sanitize(&self, err: &dyn Error) -> String {
        self.sanitize_message(&err.to_string())
    }

    /// Classify an error into an [`AppError`].
    ///
    /// The kind always comes from the rule table (generic fallback maps
    /// to 500); verbose mode only swaps the message for the raw text.
    pub fn classify(&self, err: &dyn Error) -> AppError {
        let raw = err.to_string();
        let (kind, safe) = self.resolve(&raw);
        let message = if self.verbose && !raw.trim().is_empty() {
            raw
        } else {
            safe
        };
        AppError::new(kind, message)
    }

    fn resolve(&self, raw: &str) -> (ErrorKind, String) {
        let haystack = raw.to_lowercase();
        for rule in &self.rules {
            if haystack.contains(rule.pattern.as_ref()) {
                tracing::debug!(
                    pattern = %rule.pattern,
                    kind = %rule.kind,
                    "raw error matched sanitize rule"
                );
                return (rule.kind, rule.message.to_string());
            }
        }
        tracing::warn!(raw, "unclassified error degraded to generic message");
        (ErrorKind::InternalServerError, GENERIC_ERROR_MESSAGE.to_string())
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_rules() {
        let sanitizer = ErrorSanitizer::new();
        assert_eq!(
            sanitizer.sanitize_message("duplicate key value violates unique constraint"),
            "This record already exists."
        );
        assert_eq!(
            sanitizer.sanitize_message("null value in column \"email\" violates not-null constraint"),
            "A required field is missing."
        );
        assert_eq!(
            sanitizer.sanitize_message("no rows returned by a query that expected to return a row"),
            "The requested record was not found."
        );
    }

    #[test]
    fn test_auth_rules() {
        let sanitizer = ErrorSanitizer::new();
        assert_eq!(
            sanitizer.sanitize_message("Invalid login credentials"),
            "Invalid email or password."
        );
        assert_eq!(
            sanitizer.sanitize_message("429: Too Many Requests"),
            THROTTLED_MESSAGE
        );
    }

    #[test]
    fn test_transport_rules() {
        let sanitizer = ErrorSanitizer::new();
        assert_eq!(
            sanitizer.sanitize_message("TypeError: Failed to fetch"),
            "Unable to reach the server. Please check your connection."
        );
        assert_eq!(
            sanitizer.sanitize_message("upstream request timed out after 30s"),
            "The request took too long. Please try again."
        );
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let sanitizer = ErrorSanitizer::new();
        assert_eq!(
            sanitizer.sanitize_message("DUPLICATE KEY value violates UNIQUE constraint"),
            "This record already exists."
        );
    }

    #[test]
    fn test_unmatched_falls_back_to_generic() {
        let sanitizer = ErrorSanitizer::new();
        assert_eq!(
            sanitizer.sanitize_message("some totally novel internal message"),
            GENERIC_ERROR_MESSAGE
        );
        assert_eq!(sanitizer.sanitize_message(""), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_first_match_wins() {
        let sanitizer = ErrorSanitizer::new();
        // Both an auth pattern and a storage pattern are present; the
        // auth rule sits earlier in the table.
        assert_eq!(
            sanitizer.sanitize_message("user not found while checking duplicate key"),
            "No account found for that email address."
        );
    }

    #[test]
    fn test_pushed_rule_extends_table() {
        let mut sanitizer = ErrorSanitizer::new();
        sanitizer.push_rule("TEAPOT", ErrorKind::BadRequest, "Short and stout.");
        assert_eq!(sanitizer.sanitize_message("I am a teapot"), "Short and stout.");
        // Built-in rules still take precedence.
        assert_eq!(
            sanitizer.sanitize_message("teapot with duplicate key"),
            "This record already exists."
        );
    }

    #[test]
    fn test_verbose_passthrough() {
        let sanitizer = ErrorSanitizer::new().with_verbose(true);
        assert_eq!(
            sanitizer.sanitize_message("pg: relation \"users\" does not exist"),
            "pg: relation \"users\" does not exist"
        );
        assert_eq!(sanitizer.sanitize_message("   "), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_from_env_verbose_flag() {
        unsafe { std::env::set_var(VERBOSE_ERRORS_ENV, "yes") };
        assert!(ErrorSanitizer::from_env().verbose());

        unsafe { std::env::set_var(VERBOSE_ERRORS_ENV, "0") };
        assert!(!ErrorSanitizer::from_env().verbose());

        unsafe { std::env::remove_var(VERBOSE_ERRORS_ENV) };
        assert!(!ErrorSanitizer::from_env().verbose());
    }

    #[test]
    fn test_sanitize_error_value() {
        let sanitizer = ErrorSanitizer::new();
        let err = std::io::Error::other("connection refused (os error 111)");
        assert_eq!(
            sanitizer.sanitize(&err),
            "Unable to reach the server. Please check your connection."
        );
    }

    #[test]
    fn test_classify_maps_kind() {
        let sanitizer = ErrorSanitizer::new();

        let err = std::io::Error::other("duplicate key value violates unique constraint");
        let app = sanitizer.classify(&err);
        assert_eq!(app.kind(), ErrorKind::Conflict);
        assert_eq!(app.message(), "This record already exists.");

        let err = std::io::Error::other("anything else");
        let app = sanitizer.classify(&err);
        assert_eq!(app.status_code(), 500);
        assert!(app.is_server_error());
    }
}
