use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "SALIDAS_LOG";

/// Installs the global fmt subscriber. Output goes to stderr because stdout
/// carries the IPC responses.
///
/// Filter precedence: `SALIDAS_LOG`, then `RUST_LOG`, then `default_level`.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
