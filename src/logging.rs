//! Tracing subscriber setup for the `wear` binary.
//!
//! Logs go to stderr so stdout stays clean for JSON/CSV output. The filter comes
//! from `WEAR_LOG` (or `RUST_LOG`); without either, `-v` flags pick the level.

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "WEAR_LOG";

pub fn init(verbosity: u8) {
    let fallback = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(format!("wearable_data={fallback}")));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
