//! Shared types for the reelsync consensus system
//!
//! Contains the domain types that cross the engine/server boundary and the
//! tracing setup used by the server binary. Component-internal types (like the
//! stored session record) are kept in their respective crates.

pub mod logging;
pub mod types;

pub use types::*;
