use tracing_subscriber::EnvFilter;

use crate::error::{Result, ToolError};

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// verbosity count. Logs go to stderr so reports on stdout stay clean.
pub fn init(verbosity: u8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbosity {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}
