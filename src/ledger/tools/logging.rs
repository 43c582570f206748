use tracing_subscriber::{EnvFilter, fmt};

use crate::ledger::tools::error::{LedgerError, Result};

/// Initialises the tracing subscriber for the binary.
///
/// The filter is taken from `RUST_LOG` and defaults to `info`.
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| LedgerError::Logging(error.to_string()))
}
