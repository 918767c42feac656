use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILTER_ENV: &str = "MENULENS_LOG";
const DEFAULT_FILTER: &str = "info";

/// Initialize tracing with the MENULENS_LOG environment variable.
///
/// Defaults to "info" level if MENULENS_LOG is not set or does not parse.
/// Returns `false` when a global subscriber was already installed, so hosts
/// and tests can call this more than once.
pub fn init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_FILTER_ENV)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .is_ok()
}
