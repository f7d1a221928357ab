//! Sentinel Crate - Security Utility Layer
//!
//! This crate provides the reusable security primitives that sit in front
//! of an authentication boundary:
//! - Sliding-window rate limiting keyed by caller identity
//! - Credential and input validation (email, password, free text)
//! - Error sanitization (raw internal errors to safe user-facing messages)
//! - A guard combining throttling and sanitization around one operation

pub mod guard;
pub mod rate_limit;
pub mod sanitize;
pub mod validate;
