//! Shared logging utilities for consistent tracing across the workspace

/// Initialize tracing subscriber with an explicit base log level.
///
/// `RUST_LOG` overrides the computed filter when set, so operators can still
/// turn individual targets up or down without a restart flag.
pub fn init_tracing_with_level(log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let base_level = log_level.unwrap_or("info");
    let default_filter =
        format!("server={base_level},engine={base_level},shared={base_level},tower_http=warn");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::debug!("Tracing initialized (base filter: {default_filter})");
}

/// Initialize tracing with the default level
pub fn init_tracing() {
    init_tracing_with_level(None);
}
