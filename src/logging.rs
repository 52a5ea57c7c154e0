//! Diagnostic tracing, written to stderr.
//!
//! Status lines meant for the operator go through [crate::ui]; the reports
//! and build logs under the root directory are written by their stages and
//! are unaffected by `RUST_LOG`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; falls back to `info`, or `debug` with `--verbose`.
///
/// # Example
/// ```bash
/// RUST_LOG=esgf_build=trace esgf-build --branch latest --yes
/// ```
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
