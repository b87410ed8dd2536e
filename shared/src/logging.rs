use tracing_subscriber::EnvFilter;

/// Initialise logging. The default level is `info`; `verbose` switches to
/// `debug` and lets `RUST_LOG` override the filter.
pub fn init(verbose: bool) {
    // Without --verbose the level is pinned so a stray RUST_LOG in the
    // user's environment cannot flood the terminal at 60 Hz.
    let level = if verbose { "debug" } else { "info" };

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
