//! E2E monitor library.
//!
//! Provides a test harness for end-to-end checks written as plain Rust functions,
//! a runner that schedules those checks and tracks their outcome, and the HTTP
//! API that exposes the results.

pub mod api;
pub mod config;
pub mod error;
pub mod harness;
pub mod middleware;
pub mod models;
pub mod services;
