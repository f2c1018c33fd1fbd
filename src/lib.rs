//! Vertable – schema-free records on top of a single "vertical" SQLite table.
//!
//! Instead of one fixed-schema table per record type, every record is spread
//! over as many rows as it has attributes. A table always has the same five
//! columns:
//! * `Id` – surrogate row key, meaningless to callers.
//! * `ObjId` – the logical record identifier shared by all rows of a record.
//! * `Attr` – attribute name, unique per `ObjId`.
//! * `Val` – the attribute value as text.
//! * `Typ` – a type tag telling how `Val` is read back (`int`, `bool`,
//!   `string`, `Time`, or anything else which then reads back as text).
//!
//! New attributes therefore never need a migration.
//!
//! ## Modules
//! * [`datatype`] – [`datatype::Value`], the `(Val, Typ)` codec and the
//!   [`datatype::Time`] timestamp type.
//! * [`construct`] – rows, records, the [`construct::Storable`] contract,
//!   the row assembler and the [`construct::Database`] facade (insert,
//!   update, upsert, filtered reads, range deletes).
//! * [`persist`] – the SQLite side: table bootstrap, ObjId allocation and the
//!   statements behind every operation.
//! * [`config`] – layered settings for the demo programs.
//!
//! ## Quick Start
//! ```
//! use vertable::construct::{Database, PersistenceMode, Record};
//! use vertable::datatype::Value;
//! let db = Database::new(PersistenceMode::InMemory).unwrap();
//! db.create_table("demo", false).unwrap();
//! let mut simba = Record::new();
//! simba.insert("Name".to_string(), Value::from("Simba"));
//! let stored = db.insert("demo", &simba).unwrap();
//! assert_eq!(stored["Id"], Value::Int(1));
//! let found = db.get_filtered("demo", "Attr = 'Name' AND Val = 'Simba'").unwrap();
//! assert_eq!(found.len(), 1);
//! ```
//!
//! ## Concurrency
//! A [`construct::Database`] serializes its operations on one connection.
//! Two handles (or two processes) on the same file are not coordinated:
//! ObjId allocation is `max(ObjId) + 1` and may collide across them.

pub mod config;
pub mod construct;
pub mod datatype;
pub mod error;
pub mod logging;
pub mod persist;
