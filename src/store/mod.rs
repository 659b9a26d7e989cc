//! Store module for PulseWatch.
//!
//! In-memory authoritative resource collection with JSON-snapshot durability.

mod models;
mod store;

pub use models::*;
pub use store::*;
