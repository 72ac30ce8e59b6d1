/// Logging setup for SvcProbe
///
/// Initializes the tracing-based console logger. Verbose mode raises the
/// default filter so per-connection status lines become visible.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize console logging
///
/// The filter defaults to warnings, or connection-level information when
/// `verbose` is set; `RUST_LOG` overrides both.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "svcprobe=info"
    } else {
        "svcprobe=warn"
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // try_init keeps repeated initialization (e.g. in tests) harmless
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(false);
        init_logging(true);
    }
}
