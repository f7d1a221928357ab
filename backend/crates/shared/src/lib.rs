//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of vocabulary shared by every
//! consumer of the security layer:
//! - Common error types and result aliases
//! - The classification vocabulary safe messages resolve to
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all embedding applications.

pub mod error {
    pub mod app_error;
    pub mod kind;
}
