//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the Aegis tracing/logging system.
///
/// Reads the `AEGIS_LOG` environment variable for per-subsystem log levels,
/// e.g. `AEGIS_LOG=aegis_analysis::pipeline=debug,aegis_analysis::parsers=info`.
/// `default_directive` is used when `AEGIS_LOG` is unset or invalid.
///
/// Output goes to stderr so that report output on stdout stays machine-readable.
/// Idempotent: only the first call installs a subscriber.
pub fn init_tracing(default_directive: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("AEGIS_LOG")
            .unwrap_or_else(|_| EnvFilter::new(default_directive));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .with(filter)
            .init();
    });
}
