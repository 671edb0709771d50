// Logging setup
//
// Logs go to stderr so answers printed on stdout stay clean. RUST_LOG
// always wins; otherwise the crate logs at info, or debug when verbose.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

const CRATE_TARGET: &str = "orderdesk";

/// Default filter directive when RUST_LOG is unset
pub fn default_directive(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    // Dependencies stay at warn so sqlx/reqwest chatter doesn't bury the trace.
    format!("warn,{}={}", CRATE_TARGET, level)
}

/// Install the global subscriber and bridge `log` records (sqlx) into it.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbose),
    );

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    tracing_log::LogTracer::init().context("Failed to bridge log records into tracing")?;

    tracing::debug!("Logging initialized (verbose: {})", verbose);
    Ok(())
}
