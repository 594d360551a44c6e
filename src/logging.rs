//! Tracing subscriber setup for the `analyst` binary.
//!
//! Logs go to stderr so that stdout stays clean for answers and `--json`
//! output. `RUST_LOG` overrides the default filter.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Call once, before any other work.
pub fn init(verbose: bool) {
    let default = if verbose {
        "report_analyst=debug,analyst=debug"
    } else {
        "report_analyst=info,analyst=info,warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (e.g. from tests) is not an error.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(false)
        .try_init();
}
