//! Session consensus engine
//!
//! This library holds the server-authoritative state machine for shared
//! swipe sessions: lifecycle transitions, idempotent swipe ingestion,
//! match and finalist computation, and the polling-driven reconciliation
//! that advances a session without any push channel.

pub mod bot;
pub mod core;
pub mod engine_impl;
pub mod error;
pub mod session;
pub mod store;
pub mod traits;

// Re-export commonly used types
pub use engine_impl::{CreateSessionParams, EngineConfig, NewParticipant, SessionEngine};
pub use error::{EngineError, EngineResult};
pub use session::{RoundLimits, Session};
pub use store::MemorySessionStore;
pub use traits::{MockSessionStore, SessionStore};
