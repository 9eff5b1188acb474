//! Server runtime state

use std::net::SocketAddr;
use std::time::Instant;

/// Process-level state shared by all handlers
#[derive(Debug)]
pub struct ServerState {
    pub bind_address: SocketAddr,
    pub started_at: Instant,
}

impl ServerState {
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
