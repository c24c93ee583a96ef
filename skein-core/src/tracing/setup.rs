//! Logging bootstrap for embedders and tests.

use tracing_subscriber::EnvFilter;

/// Default filter when `SKEIN_LOG` is unset: engine progress at info,
/// everything else quiet.
const DEFAULT_FILTER: &str = "skein_core=info,skein_analysis=info";

/// Install the global tracing subscriber.
///
/// Per-subsystem levels come from `SKEIN_LOG`, e.g.
/// `SKEIN_LOG=skein_analysis::engine=debug,skein_analysis::detectors=trace`.
/// Safe to call from every test and embedder entry point: if a subscriber
/// is already installed the call is a no-op.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("SKEIN_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init();
}
