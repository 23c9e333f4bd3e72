//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins when set. Otherwise `-v` raises the level to debug and
/// `-vv` to trace; without either the configured level applies.
pub fn init(verbose: u8, configured: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, configured)));

    // A subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_directive(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}
