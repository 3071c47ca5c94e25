//! Tracing subscriber setup shared by the sdjuke binaries

use crate::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the default filter directive for a binary
///
/// `RUST_LOG` always wins over this value when it is set.
pub fn default_directive(crate_target: &str, level: &str) -> String {
    format!("{crate_target}={level},sdjuke_common={level}")
}

/// Install the global tracing subscriber (env filter + fmt layer)
pub fn init_tracing(crate_target: &str, level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(crate_target, level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {}", e)))
}
