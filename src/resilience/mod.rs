//! Resilience helpers.
//!
//! # Design Decisions
//! - Every wait on the ACME server is bounded by a deadline (see `acme::issuer`)
//! - Polling intervals come from one schedule type so fixed and backing-off
//!   polls share the same code path

pub mod backoff;

pub use backoff::{calculate_backoff, PollSchedule};
