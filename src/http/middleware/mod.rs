//! Middleware applied to every API route.

pub mod tracking;

pub use tracking::track_requests;
