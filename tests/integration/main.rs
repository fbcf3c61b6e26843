//! HTTP integration tests.
//!
//! Drives the routes through `actix_web::test` against an in-process runner;
//! no network or external services are needed.
//!
//! Run with: cargo test --test integration

mod test_helpers;

mod test_force;
mod test_history;
mod test_live_output;
mod test_status;
