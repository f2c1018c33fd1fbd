use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Result, VertableError};

// RUST_LOG wins over the configured level when it is set.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|err| VertableError::Config(format!("invalid log level: {err}")))?,
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|_| VertableError::Config("logging already initialized".into()))
}
