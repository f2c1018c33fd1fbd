// config lets you read a separate config file
use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::construct::PersistenceMode;
use crate::error::Result;

pub const DEFAULT_CONFIG: &str = "vertable";
pub const ENV_PREFIX: &str = "VERTABLE";
pub const IN_MEMORY: &str = ":memory:";

/// Settings for the demo programs.
///
/// Built-in defaults, then an optional config file (any format the `config`
/// crate knows, e.g. `vertable.toml`), then `VERTABLE_*` environment
/// variables, later sources winning.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub database: String,
    pub table: String,
    pub drop_first: bool,
    pub log: String,
}

impl Settings {
    pub fn load(file: Option<&str>) -> Result<Settings> {
        let settings = Config::builder()
            .set_default("database", "vertable.db")?
            .set_default("table", "demo")?
            .set_default("drop_first", false)?
            .set_default("log", "info")?
            .add_source(File::with_name(file.unwrap_or(DEFAULT_CONFIG)).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
    pub fn persistence_mode(&self) -> PersistenceMode {
        if self.database == IN_MEMORY {
            PersistenceMode::InMemory
        } else {
            PersistenceMode::File(self.database.clone())
        }
    }
}
