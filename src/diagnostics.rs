//! Diagnostic output of the logger itself
//!
//! Retention failures, webhook outcomes and queue problems are reported through
//! `tracing`. Libraries leave subscriber setup to the application; the `kantan` binary
//! calls [`init_diagnostics`] to send them to stderr.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Environment variable holding the diagnostic filter directives
pub const FILTER_ENV: &str = "KANTAN_LOG";

/// Default filter when `KANTAN_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "kantan=info";

/// Install a stderr subscriber filtered by `KANTAN_LOG`, falling back to `default_filter`
///
/// Fails if a global subscriber is already set.
pub fn init_diagnostics(default_filter: &str) -> Result<(), TryInitError> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let env_filter = tracing_subscriber::EnvFilter::try_from_env(FILTER_ENV)
        .unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
}
