//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! GET /domains/{domain}/config
//!     → router.rs (per-domain override, else default destinations)
//!     → document.rs (Gildra routing document)
//!     → JSON to Gildra
//!
//! Config reload:
//!     RoutingSettings
//!     → normalized (lowercase domains)
//!     → swapped atomically into RouteTable
//! ```
//!
//! # Design Decisions
//! - Lookups never block reloads (arc-swap snapshot)
//! - Domain lookup is case-insensitive (DNS names are)
//! - Every domain gets a document; unknown domains use the defaults

pub mod document;
pub mod router;

pub use document::{Destination, Match, RoutingConfig, Rule};
pub use router::RouteTable;
