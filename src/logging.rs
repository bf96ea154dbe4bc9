use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with a compact stderr layer.
///
/// - Default level: INFO, debug for this crate; override via RUST_LOG
/// - Safe to call more than once (later calls are no-ops)
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,api_compat_lib=debug"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();

    tracing::debug!("Tracing initialized");
}
