//! Demo: stores a few members (typed structs and one JSON bag) into a fresh
//! `demo` table and lists what was stored.
//!
//! Usage: `vertable [database-path]`, other settings come from `vertable.*`
//! config files and `VERTABLE_*` environment variables.
use std::process::ExitCode;

use serde_json::{json, Value as Json};
use tracing::info;

use vertable::config::Settings;
use vertable::construct::Database;
use vertable::error::Result;
use vertable::logging::init_logging;
use vertable::storable;

struct Member {
    name: String,
    birth: String,
    service: String,
    children: Json,
}
storable!(Member {
    "Name" => name,
    "Birth" => birth,
    "Service" => service,
    "Children" => children,
});

fn main() -> ExitCode {
    let database = std::env::args().nth(1);
    match run(database) {
        Ok(()) => ExitCode::SUCCESS,
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
    let table = settings.table.as_str();
    // every run starts over
    db.create_table(table, true)?;
    info!(database = %settings.database, table, "table recreated");

    let members = [
        Member {
            name: "Simba".into(),
            birth: "99/09/09".into(),
            service: "National Chengcheng University".into(),
            children: json!([]),
        },
        Member {
            name: "Kenny".into(),
            birth: "88/08/08".into(),
            service: "Taipei Municipal Jianjian High School".into(),
            children: json!([]),
        },
        Member {
            name: "Muse".into(),
            birth: "66/06/06".into(),
            service: "New Taipei Municipal Qingsui High School".into(),
            children: json!([{ "Name": "Simba" }, { "Name": "Kenny" }]),
        },
    ];
    for member in &members {
        let stored = db.insert(table, member)?;
        println!("{}: {:?}", member.name, stored);
    }

    let wade = json!({
        "Name": "Wade",
        "Birth": "55/05/05",
        "Service": "Fufufu Trading Ltd.",
        "Children": [{ "Name": "Simba" }, { "Name": "Kenny" }],
    });
    if let Json::Object(wade) = wade {
        let stored = db.insert(table, &wade)?;
        println!("Wade: {:?}", stored);
    }

    let all = db.gets(table)?;
    info!(records = all.len(), "listing");
    for record in all {
        println!("{:?}", record);
    }
    Ok(())
}
