//! Logging setup for the binary
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the process entry point.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::config::LoggingConfig;

/// Install the global subscriber
///
/// `RUST_LOG` wins over `logging.level`; `debug` forces the `debug` level for
/// this crate. Logs go to stderr so stdout stays machine-readable. Calling
/// this twice is a no-op.
pub fn init(config: &LoggingConfig, debug: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if debug {
            "stepwright=debug,info"
        } else {
            config.level.as_str()
        };
        EnvFilter::new(level)
    });

    let json = config.json;
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| {
            fmt::layer()
                .with_target(debug)
                .with_writer(std::io::stderr)
        }))
        .try_init();
}
