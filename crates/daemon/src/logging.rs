//! Tracing subscriber setup
//!
//! `RUST_LOG` overrides the default filter, which keeps info for the
//! library crates (`prioritizer_*`) and for this binary (`queue_prioritizer`).
//! `PRIORITIZER_LOG_FORMAT=json` switches to JSON lines; anything else is pretty.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "prioritizer=info,queue_prioritizer=info";

pub fn init_logging() -> Result<()> {
    let log_format =
        std::env::var("PRIORITIZER_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);
    match log_format.as_str() {
        // Production: JSON structured logging
        "json" => registry.with(fmt::layer().json()).try_init(),
        _ => registry.with(fmt::layer().pretty()).try_init(),
    }
    .context("Failed to install tracing subscriber")?;

    Ok(())
}
