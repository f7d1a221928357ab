//! Input Validation
//!
//! Stateless acceptance predicates for credentials and free-form input.
//! Every function here is pure; callers may invoke them concurrently
//! without coordination.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// Constants
// ============================================================================

/// Maximum total email length (RFC 5321 practical limit)
pub const EMAIL_MAX_LENGTH: usize = 254;

/// Maximum length of the local part (before the `@`)
pub const LOCAL_PART_MAX_LENGTH: usize = 64;

/// Maximum length of a single domain label
pub const DOMAIN_LABEL_MAX_LENGTH: usize = 63;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Upper bound on sanitized free-form input
pub const MAX_INPUT_LENGTH: usize = 1000;

/// Special characters accepted toward the password special-class requirement
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?`~";

/// Non-alphanumeric characters allowed in the local part of an email
const LOCAL_PART_SYMBOLS: &str = "._%+-";

// ============================================================================
// Email
// ============================================================================

/// Structural email validation.
///
/// Accepts addresses with exactly one `@`, a local part of 1 to 64
/// characters drawn from alphanumerics and `._%+-`, and a domain of at
/// least two dot-separated labels, each 1 to 63 alphanumeric/hyphen
/// characters not starting or ending with a hyphen. Total length is
/// capped at [`EMAIL_MAX_LENGTH`].
///
/// This is a structural approximation, not deliverability verification.
///
/// # Examples
/// ```rust
/// use sentinel::validate::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(!is_valid_email("not-an-email"));
/// ```
pub fn is_valid_email(input: &str) -> bool {
    if input.is_empty() || input.chars().count() > EMAIL_MAX_LENGTH {
        return false;
    }
    let Some((local, domain)) = input.split_once('@') else {
        return false;
    };
    if domain.contains('@') {
        return false;
    }
    is_valid_local_part(local) && is_valid_domain(domain)
}

fn is_valid_local_part(local: &str) -> bool {
    let length = local.chars().count();
    if length == 0 || length > LOCAL_PART_MAX_LENGTH {
        return false;
    }
    local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || LOCAL_PART_SYMBOLS.contains(c))
}

fn is_valid_domain(domain: &str) -> bool {
    let mut labels = 0;
    for label in domain.split('.') {
        if !is_valid_domain_label(label) {
            return false;
        }
        labels += 1;
    }
    labels >= 2
}

fn is_valid_domain_label(label: &str) -> bool {
    if label.is_empty() || label.len() > DOMAIN_LABEL_MAX_LENGTH {
        return false;
    }
    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }
    label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

// ============================================================================
// Password
// ============================================================================

/// Password policy violation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    TooShort,
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    TooLong,
    #[error("password must contain a lowercase letter")]
    MissingLowercase,
    #[error("password must contain an uppercase letter")]
    MissingUppercase,
    #[error("password must contain a digit")]
    MissingDigit,
    #[error("password must contain a special character")]
    MissingSpecial,
}

/// Validate a password against the composition policy.
///
/// The input is NFKC-normalized before counting so visually equivalent
/// sequences (full-width forms, combining marks) measure consistently.
/// The normalized form must be 8 to 128 characters and contain at least
/// one lowercase letter, one uppercase letter, one digit, and one
/// character from [`SPECIAL_CHARACTERS`]. All four classes are required
/// simultaneously.
///
/// # Errors
/// Returns the first [`PasswordPolicyError`] violated, checked in the
/// order: length bounds, lowercase, uppercase, digit, special.
pub fn validate_password(input: &str) -> Result<(), PasswordPolicyError> {
    let normalized: String = input.nfkc().collect();
    let length = normalized.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(PasswordPolicyError::TooShort);
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(PasswordPolicyError::TooLong);
    }
    if !normalized.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PasswordPolicyError::MissingLowercase);
    }
    if !normalized.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordPolicyError::MissingUppercase);
    }
    if !normalized.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordPolicyError::MissingDigit);
    }
    if !normalized.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        return Err(PasswordPolicyError::MissingSpecial);
    }
    Ok(())
}

/// Boolean form of [`validate_password`].
///
/// # Examples
/// ```rust
/// use sentinel::validate::is_valid_password;
///
/// assert!(is_valid_password("Abcdef1!"));
/// assert!(!is_valid_password("abcdefgh"));
/// ```
pub fn is_valid_password(input: &str) -> bool {
    validate_password(input).is_ok()
}

// ============================================================================
// Free-form input
// ============================================================================

/// Sanitize free-form text input.
///
/// Trims surrounding whitespace, strips literal `<` and `>` characters,
/// and truncates to [`MAX_INPUT_LENGTH`] characters. Stripping brackets
/// blunts the simplest HTML-injection vector; it is not a substitute
/// for output encoding at render time. Never fails; empty input maps to
/// an empty result.
///
/// # Examples
/// ```rust
/// use sentinel::validate::sanitize_input;
///
/// assert_eq!(sanitize_input("  <script>hi</script>  "), "scripthi/script");
/// ```
pub fn sanitize_input(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(MAX_INPUT_LENGTH)
        .collect()
}
