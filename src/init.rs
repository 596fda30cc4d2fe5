use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Install the global `tracing` subscriber.
///
/// **Parameters**
/// - `level`: an [`EnvFilter`] directive such as `info`, `DEBUG` or
///   `ndjson_batch_sink=debug,tower_http=info`. An unparsable directive
///   falls back to `info`.
///
/// **Returns**
/// - `Err(..)` if a global subscriber is already installed.
pub fn init_tracing(level: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_new(level.to_ascii_lowercase())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(filter)
        .with(fmt::layer())
        .try_init()
}
