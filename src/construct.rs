use std::sync::{Arc, Mutex, MutexGuard};

// records are kept ordered by attribute name
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

// used to bind caller supplied filter parameters
use rusqlite::ToSql;
// generic key/value bags arrive as parsed JSON
use serde_json::{Map, Value as Json};
use tracing::{debug, warn};

// our own stuff that we need
use crate::datatype::{decode, encode, Value};
use crate::error::{Result, VertableError};
pub use crate::persist::PersistenceMode;
use crate::persist::Persistor;

// ------------- Object -------------
// Every row belonging to one logical record shares the same ObjId.
pub type ObjId = i64;

// The attribute name under which a record exposes its ObjId.
pub const ID: &str = "Id";

/// One physical row of a table, one attribute of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: i64,
    pub obj_id: ObjId,
    pub attr: String,
    pub val: String,
    pub typ: String,
}

/// An encoded attribute that has not yet been given an ObjId.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub attr: String,
    pub val: String,
    pub typ: String,
}
impl Triple {
    pub fn new(attr: String, value: &Value) -> Self {
        let (val, typ) = encode(value);
        Self { attr, val, typ }
    }
}

/// A logical record, attribute name to decoded value, always carrying `Id`.
pub type Record = BTreeMap<String, Value>;

pub fn record_id(record: &Record) -> Option<ObjId> {
    record.get(ID).and_then(Value::as_int)
}

// ------------- Storable -------------
/// Anything that can be exploded into attribute rows.
///
/// `attributes` lists the `(name, value)` pairs to store, in order. An
/// attribute named `Id` is never stored; `id` reports which object an update
/// or upsert targets, with zero or negative meaning "none".
pub trait Storable {
    fn attributes(&self) -> Vec<(String, Value)>;
    fn id(&self) -> Option<ObjId> {
        None
    }
}
impl<S: Storable + ?Sized> Storable for &S {
    fn attributes(&self) -> Vec<(String, Value)> {
        (**self).attributes()
    }
    fn id(&self) -> Option<ObjId> {
        (**self).id()
    }
}
impl<S: Storable + ?Sized> Storable for Box<S> {
    fn attributes(&self) -> Vec<(String, Value)> {
        (**self).attributes()
    }
    fn id(&self) -> Option<ObjId> {
        (**self).id()
    }
}
impl Storable for Record {
    fn attributes(&self) -> Vec<(String, Value)> {
        self.iter()
            .filter(|(attr, _)| attr.as_str() != ID)
            .map(|(attr, value)| (attr.clone(), value.clone()))
            .collect()
    }
    fn id(&self) -> Option<ObjId> {
        record_id(self)
    }
}
impl<H: BuildHasher> Storable for HashMap<String, Value, H> {
    fn attributes(&self) -> Vec<(String, Value)> {
        self.iter()
            .filter(|(attr, _)| attr.as_str() != ID)
            .map(|(attr, value)| (attr.clone(), value.clone()))
            .collect()
    }
    fn id(&self) -> Option<ObjId> {
        self.get(ID).and_then(Value::as_int)
    }
}
// Parsed JSON surfaces every number as a float, so a whole float is an id too.
impl Storable for Map<String, Json> {
    fn attributes(&self) -> Vec<(String, Value)> {
        self.iter()
            .filter(|(attr, _)| attr.as_str() != ID)
            .map(|(attr, value)| (attr.clone(), Value::from(value)))
            .collect()
    }
    fn id(&self) -> Option<ObjId> {
        let id = self.get(ID)?;
        id.as_i64().or_else(|| {
            id.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as ObjId)
        })
    }
}

/// Implements [`Storable`] for a struct by listing attribute names and the
/// fields they come from. An `id: field` entry names the identifier field.
///
/// ```
/// use vertable::storable;
/// struct Member { id: i64, name: String, active: bool }
/// storable!(Member { id: id, "Name" => name, "Active" => active });
/// ```
#[macro_export]
macro_rules! storable {
    ($ty:ty { id: $id:ident, $($attr:literal => $field:ident),* $(,)? }) => {
        impl $crate::construct::Storable for $ty {
            fn attributes(&self) -> Vec<(String, $crate::datatype::Value)> {
                vec![$(
                    (String::from($attr), $crate::datatype::Value::from(self.$field.clone()))
                ),*]
            }
            fn id(&self) -> Option<$crate::construct::ObjId> {
                Some($crate::construct::ObjId::from(self.$id))
            }
        }
    };
    ($ty:ty { $($attr:literal => $field:ident),* $(,)? }) => {
        impl $crate::construct::Storable for $ty {
            fn attributes(&self) -> Vec<(String, $crate::datatype::Value)> {
                vec![$(
                    (String::from($attr), $crate::datatype::Value::from(self.$field.clone()))
                ),*]
            }
        }
    };
}

fn positive_id<S: Storable + ?Sized>(record: &S) -> Option<ObjId> {
    record.id().filter(|id| *id > 0)
}

fn triples<S: Storable + ?Sized>(record: &S) -> Vec<Triple> {
    record
        .attributes()
        .into_iter()
        .filter(|(attr, _)| attr != ID)
        .map(|(attr, value)| Triple::new(attr, &value))
        .collect()
}

// ------------- Assembly -------------
/// Folds rows ordered by ObjId back into records, one per ObjId.
///
/// Rows of one object must be contiguous. Attributes whose value cannot be
/// decoded are left out, and a stored `Id` attribute never overrides the
/// ObjId. No rows give no records.
pub fn assemble<I: IntoIterator<Item = Row>>(rows: I) -> Vec<Record> {
    let mut records = Vec::new();
    let mut cursor: Option<ObjId> = None;
    let mut record = Record::new();
    for row in rows {
        if cursor.is_some_and(|obj_id| obj_id != row.obj_id) {
            records.push(std::mem::take(&mut record));
        }
        cursor = Some(row.obj_id);
        record.insert(ID.to_string(), Value::Int(row.obj_id));
        if row.attr != ID {
            if let Some(value) = decode(&row.val, &row.typ) {
                record.insert(row.attr, value);
            }
        }
    }
    if cursor.is_some() {
        records.push(record);
    }
    records
}

// ------------- Database -------------
// Each public operation holds the persistor for its whole duration, so the
// allocate-then-insert and check-then-write sequences below are not
// interleaved by other users of the same Database.
pub struct Database {
    // responsible for the persistence layer
    persistor: Arc<Mutex<Persistor>>,
}

impl Database {
    pub fn new(mode: PersistenceMode) -> Result<Database> {
        let persistor = Persistor::new(&mode)?;
        debug!(?mode, "database opened");
        Ok(Database {
            persistor: Arc::new(Mutex::new(persistor)),
        })
    }
    pub fn persistor(&self) -> Result<MutexGuard<'_, Persistor>> {
        self.persistor
            .lock()
            .map_err(|err| VertableError::Lock(err.to_string()))
    }
    pub fn create_table(&self, table: &str, drop_first: bool) -> Result<()> {
        self.persistor()?.create_table(table, drop_first)
    }
    pub fn drop_table(&self, table: &str) -> Result<()> {
        self.persistor()?.drop_table(table)
    }
    pub fn max_id(&self, table: &str) -> Result<ObjId> {
        self.persistor()?.max_id(table)
    }
    pub fn next_id(&self, table: &str) -> Result<ObjId> {
        self.persistor()?.next_id(table)
    }
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        self.persistor()?.count_rows(table)
    }
    // ------------- Reads -------------
    pub fn get(&self, table: &str, id: ObjId) -> Result<Option<Record>> {
        let persistor = self.persistor()?;
        read(&persistor, table, id)
    }
    pub fn gets(&self, table: &str) -> Result<Vec<Record>> {
        let rows = self
            .persistor()?
            .all_rows(table)
            .inspect_err(|err| warn!(table, error = %err, "could not read records"))?;
        Ok(assemble(rows))
    }
    /// Records having at least one row that satisfies `predicate`, a boolean
    /// SQL expression over `Attr` and `Val` (for example
    /// `Attr = 'Name' AND Val = 'Kenny'`). The predicate is spliced into the
    /// statement as written; see [`Database::get_filtered_with`] for bound
    /// parameters.
    pub fn get_filtered(&self, table: &str, predicate: &str) -> Result<Vec<Record>> {
        self.get_filtered_with(table, predicate, &[])
    }
    pub fn get_filtered_with(
        &self,
        table: &str,
        predicate: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<Record>> {
        let rows = self
            .persistor()?
            .filtered_rows(table, predicate, params)
            .inspect_err(|err| warn!(table, predicate, error = %err, "could not filter records"))?;
        Ok(assemble(rows))
    }
    /// Records whose attribute `attr` is stored with the same text as `value`.
    pub fn get_by_attribute(&self, table: &str, attr: &str, value: &Value) -> Result<Vec<Record>> {
        let (val, _) = encode(value);
        self.get_filtered_with(table, "Attr = ? and Val = ?", &[&attr, &val])
    }
    // ------------- Writes -------------
    /// Stores `record` under a freshly allocated ObjId and returns it as read
    /// back from the table.
    pub fn insert<S: Storable + ?Sized>(&self, table: &str, record: &S) -> Result<Record> {
        let persistor = self.persistor()?;
        write(&persistor, table, record)
    }
    /// Stores every record in one transaction, handing out consecutive
    /// ObjIds after the current maximum. Nothing is stored if any record
    /// fails.
    pub fn insert_batch<S: Storable>(&self, table: &str, records: &[S]) -> Result<Vec<ObjId>> {
        let mut persistor = self.persistor()?;
        let mut obj_id = persistor.max_id(table)?;
        let mut objects = Vec::with_capacity(records.len());
        for record in records {
            let triples = triples(record);
            if triples.is_empty() {
                return Err(VertableError::EmptyRecord(format!(
                    "batch entry {} of {} has no attributes",
                    objects.len(),
                    table
                )));
            }
            obj_id += 1;
            objects.push((obj_id, triples));
        }
        persistor.insert_batch(table, &objects)?;
        Ok(objects.into_iter().map(|(obj_id, _)| obj_id).collect())
    }
    /// Writes every attribute of `record` onto the object it names: existing
    /// attributes get their value replaced, missing ones are added.
    pub fn update<S: Storable + ?Sized>(&self, table: &str, record: &S) -> Result<()> {
        let persistor = self.persistor()?;
        rewrite(&persistor, table, record)
    }
    /// Updates the object named by the record's id when it exists, otherwise
    /// inserts the record under a new ObjId (a stale id is discarded).
    pub fn insert_or_update<S: Storable + ?Sized>(
        &self,
        table: &str,
        record: &S,
    ) -> Result<Record> {
        let persistor = self.persistor()?;
        match positive_id(record) {
            Some(id) if read(&persistor, table, id)?.is_some() => {
                rewrite(&persistor, table, record)?;
                Ok(read(&persistor, table, id)?.unwrap_or_default())
            }
            _ => write(&persistor, table, record),
        }
    }
    /// Inserts only when the record names an id and no object has it yet.
    /// Returns `None` when nothing was done.
    pub fn insert_if_absent<S: Storable + ?Sized>(
        &self,
        table: &str,
        record: &S,
    ) -> Result<Option<Record>> {
        let persistor = self.persistor()?;
        match positive_id(record) {
            Some(id) if read(&persistor, table, id)?.is_none() => {
                write(&persistor, table, record).map(Some)
            }
            _ => Ok(None),
        }
    }
    // ------------- Deletes -------------
    pub fn delete(&self, table: &str, id: ObjId) -> Result<usize> {
        self.persistor()?.delete_object(table, id)
    }
    /// Deletes whole objects by range. With `field` being `Id` (or `ObjId`)
    /// the range is over ObjIds; otherwise it is over the stored text of
    /// that attribute, compared as text.
    pub fn delete_range(&self, table: &str, field: &str, min: i64, max: i64) -> Result<usize> {
        let persistor = self.persistor()?;
        match field {
            ID | "ObjId" => persistor.delete_object_range(table, min, max),
            attr => {
                persistor.delete_attribute_range(table, attr, &min.to_string(), &max.to_string())
            }
        }
    }
    /// Like [`Database::delete_range`], but attribute values are compared
    /// as integers.
    pub fn delete_range_numeric(
        &self,
        table: &str,
        field: &str,
        min: i64,
        max: i64,
    ) -> Result<usize> {
        let persistor = self.persistor()?;
        match field {
            ID | "ObjId" => persistor.delete_object_range(table, min, max),
            attr => persistor.delete_attribute_range_numeric(table, attr, min, max),
        }
    }
}

fn read(persistor: &Persistor, table: &str, id: ObjId) -> Result<Option<Record>> {
    let rows = persistor
        .object_rows(table, id)
        .inspect_err(|err| warn!(table, id, error = %err, "could not read record"))?;
    Ok(assemble(rows).into_iter().next())
}

fn write<S: Storable + ?Sized>(persistor: &Persistor, table: &str, record: &S) -> Result<Record> {
    let triples = triples(record);
    if triples.is_empty() {
        return Err(VertableError::EmptyRecord(format!("nothing to store in {}", table)));
    }
    let obj_id = persistor.next_id(table)?;
    persistor.insert(table, obj_id, &triples)?;
    Ok(read(persistor, table, obj_id)?.unwrap_or_default())
}

// One statement per attribute, not wrapped in a transaction.
fn rewrite<S: Storable + ?Sized>(persistor: &Persistor, table: &str, record: &S) -> Result<()> {
    let obj_id = positive_id(record).ok_or_else(|| {
        VertableError::MissingIdentifier(format!("cannot update {} without a positive Id", table))
    })?;
    for triple in triples(record) {
        if persistor.contains(table, obj_id, &triple.attr)? {
            persistor.update_value(table, obj_id, &triple.attr, &triple.val)?;
        } else {
            persistor.insert(table, obj_id, std::slice::from_ref(&triple))?;
        }
    }
    debug!(table, obj_id, "updated");
    Ok(())
}
