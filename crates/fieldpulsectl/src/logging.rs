//! tracing setup for fieldpulsectl. Logs go to stderr so stdout stays parseable.

use tracing_subscriber::EnvFilter;

/// Filter precedence: `--verbose`, then `RUST_LOG`, then the configured level.
pub fn filter_for(verbose: bool, configured: &str) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

pub fn init(verbose: bool, configured: &str) {
    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose, configured))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
