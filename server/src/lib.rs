//! HTTP API for the session consensus engine
//!
//! This library exposes the engine over a plain HTTP+JSON surface designed
//! for client-side polling: no websockets, no server push, every response is
//! the full session snapshot.

pub mod error;
pub mod server_impl;
pub mod state;
pub mod types;

// Re-export main types
pub use error::{ServerError, ServerResult};
pub use server_impl::Server;
pub use state::ServerState;
pub use types::*;
