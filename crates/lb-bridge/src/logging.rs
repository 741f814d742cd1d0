//! Tracing subscriber setup for host applications.

use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber on stderr.
///
/// `verbose` forces the `debug` level; otherwise `RUST_LOG` decides. Returns
/// `false` if a global subscriber was already installed (e.g. by the host or
/// a test harness), in which case nothing changes.
pub fn init(verbose: bool) -> bool {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
