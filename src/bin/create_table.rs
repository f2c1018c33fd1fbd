//! Creates the configured table (dropping it first when `drop_first` is set)
//! and exits.
//!
//! Usage: `create_table [database-path]`
use std::process::ExitCode;

use tracing::info;

use vertable::config::Settings;
use vertable::construct::Database;
use vertable::error::Result;
use vertable::logging::init_logging;

fn main() -> ExitCode {
    match run(std::env::args().nth(1)) {
        Ok(()) => {
            println!("Done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(database: Option<String>) -> Result<()> {
    let mut settings = Settings::load(None)?;
    if let Some(database) = database {
        settings.database = database;
    }
    init_logging(&settings.log)?;
    let db = Database::new(settings.persistence_mode())?;
    db.create_table(&settings.table, settings.drop_first)?;
    info!(
        database = %settings.database,
        table = %settings.table,
        drop_first = settings.drop_first,
        "table ready"
    );
    Ok(())
}
