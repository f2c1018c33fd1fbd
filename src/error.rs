
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VertableError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Table definition error: {0}")]
    Definition(String),
    #[error("Missing identifier: {0}")]
    MissingIdentifier(String),
    #[error("Invalid date format: {0}")]
    InvalidDate(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Invalid table name: {0}")]
    TableName(String),
    #[error("Empty record: {0}")]
    EmptyRecord(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, VertableError>;

// Helper conversions
impl From<rusqlite::Error> for VertableError {
    fn from(e: rusqlite::Error) -> Self { Self::Query(e.to_string()) }
}
impl From<::config::ConfigError> for VertableError {
    fn from(e: ::config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
