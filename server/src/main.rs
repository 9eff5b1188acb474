//! Session server entry point

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use engine::{MemorySessionStore, SessionEngine};
use server::Server;
use tracing::info;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Shared swipe session server")]
struct Args {
    /// Port for HTTP server (client connections)
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seconds of inactivity before a session expires
    #[arg(long, default_value = "7200")]
    session_ttl_secs: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    shared::logging::init_tracing_with_level(Some(&args.log_level));

    let store = MemorySessionStore::with_ttl_secs(args.session_ttl_secs);
    let engine = SessionEngine::new(store);

    let bind_address: SocketAddr = ([0, 0, 0, 0], args.port).into();
    info!(
        "🚀 Starting session server on port {} (session TTL: {}s)",
        args.port, args.session_ttl_secs
    );

    let server = Server::new(bind_address, engine);
    server.run().await.context("session server exited with error")
}
