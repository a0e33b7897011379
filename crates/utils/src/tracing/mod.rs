use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Initialize the tracing system
///
/// Honours `RUST_LOG` and falls back to [`DEFAULT_FILTER`]. Events go to
/// stderr in the compact format, with ANSI colours only on a terminal.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    init_with_filter(DEFAULT_FILTER)
}

/// Initialize the tracing system with `fallback` used when `RUST_LOG` is unset
pub fn init_with_filter(
    fallback: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(fallback)?,
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Install a subscriber that writes through the test harness
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .compact()
        .try_init();
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Span grouping everything done on behalf of one repository
pub fn repository_span(name: &str) -> Span {
    span!(Level::INFO, "repository", name = %name)
}

/// Span for a single shard-level operation
pub fn shard_span(operation: &'static str, shard: i32) -> Span {
    span!(Level::DEBUG, "shard", operation, shard)
}
