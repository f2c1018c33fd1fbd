// used for persistence
use rusqlite::{params, Connection, OptionalExtension, ToSql};
// table names cannot be bound as parameters, so they are vetted instead
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::construct::{ObjId, Row, Triple};
use crate::error::{Result, VertableError};

lazy_static! {
    static ref TABLE_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

pub fn checked_table(table: &str) -> Result<&str> {
    if TABLE_NAME.is_match(table) {
        Ok(table)
    } else {
        Err(VertableError::TableName(table.to_string()))
    }
}

// ------------- Persistence -------------
pub struct Persistor {
    connection: Connection,
}
impl Persistor {
    pub fn new(mode: &PersistenceMode) -> Result<Persistor> {
        let connection = match mode {
            PersistenceMode::InMemory => Connection::open_in_memory(),
            PersistenceMode::File(path) => Connection::open(path),
        }
        .map_err(|err| VertableError::Connection(format!("{:?}: {}", mode, err)))?;
        Ok(Persistor { connection })
    }
    // Creating an existing table is not an error. With drop_first the old
    // table (and all of its rows) is removed first, and a failed drop stops
    // before anything is created.
    pub fn create_table(&self, table: &str, drop_first: bool) -> Result<()> {
        let table = checked_table(table)?;
        if drop_first {
            self.drop_table(table)?;
        }
        let schema = format!(
            "
            create table if not exists {table} (
                Id integer primary key autoincrement,
                ObjId integer default 1,
                Attr text default 'UNKNOWN',
                Val text default 'UNKNOWN',
                Typ text default 'UNKNOWN',
                unique (ObjId, Attr)
            );
            "
        );
        self.connection
            .execute_batch(&schema)
            .map_err(|err| VertableError::Definition(format!("{}\n\t{}", err, schema.trim())))?;
        debug!(table, "table ready");
        Ok(())
    }
    pub fn drop_table(&self, table: &str) -> Result<()> {
        let table = checked_table(table)?;
        let sql = format!("drop table if exists {table}");
        self.connection
            .execute_batch(&sql)
            .map_err(|err| VertableError::Definition(format!("{}\n\t{}", err, sql)))?;
        debug!(table, "table dropped");
        Ok(())
    }
    // The largest ObjId in use, 0 for an empty table.
    pub fn max_id(&self, table: &str) -> Result<ObjId> {
        let table = checked_table(table)?;
        let max = self
            .connection
            .prepare_cached(&format!("select coalesce(max(ObjId), 0) from {table}"))?
            .query_row([], |r| r.get::<_, ObjId>(0))?;
        Ok(max)
    }
    pub fn next_id(&self, table: &str) -> Result<ObjId> {
        let next = self.max_id(table)? + 1;
        debug!(table, obj_id = next, "allocated");
        Ok(next)
    }
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let table = checked_table(table)?;
        let count = self
            .connection
            .prepare_cached(&format!("select count(*) from {table}"))?
            .query_row([], |r| r.get::<_, i64>(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
    // ------------- Reads -------------
    pub fn object_rows(&self, table: &str, obj_id: ObjId) -> Result<Vec<Row>> {
        let table = checked_table(table)?;
        self.collect_rows(
            &format!(
                "
                select Id, ObjId, Attr, Val, Typ
                    from {table}
                    where ObjId = ?
                    order by Id
                "
            ),
            &[&obj_id],
        )
    }
    pub fn all_rows(&self, table: &str) -> Result<Vec<Row>> {
        let table = checked_table(table)?;
        self.collect_rows(
            &format!(
                "
                select Id, ObjId, Attr, Val, Typ
                    from {table}
                    order by ObjId, Id
                "
            ),
            &[],
        )
    }
    // A single row only carries one attribute, so the predicate picks the
    // matching ObjIds first and every row of those objects is fetched after.
    // The predicate is SQL written by the caller and is used verbatim.
    pub fn filtered_rows(
        &self,
        table: &str,
        predicate: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<Row>> {
        let table = checked_table(table)?;
        self.collect_rows(
            &format!(
                "
                select Id, ObjId, Attr, Val, Typ
                    from {table}
                    where ObjId in (
                        select ObjId from {table} where {predicate}
                    )
                    order by ObjId, Id
                "
            ),
            params,
        )
    }
    fn collect_rows(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>> {
        let mut statement = self.connection.prepare_cached(sql)?;
        let rows = statement.query_map(params, |r| {
            Ok(Row {
                id: r.get(0)?,
                obj_id: r.get(1)?,
                attr: r.get(2)?,
                val: r.get(3)?,
                typ: r.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<Row>>>()?)
    }
    pub fn contains(&self, table: &str, obj_id: ObjId, attr: &str) -> Result<bool> {
        let table = checked_table(table)?;
        let found = self
            .connection
            .prepare_cached(&format!(
                "
                select Val
                    from {table}
                    where ObjId = ?
                    and Attr = ?
                "
            ))?
            .query_row(params![obj_id, attr], |r| r.get::<_, Option<String>>(0))
            .optional()?;
        Ok(found.is_some())
    }
    // ------------- Writes -------------
    pub fn insert(&self, table: &str, obj_id: ObjId, triples: &[Triple]) -> Result<usize> {
        let table = checked_table(table)?;
        insert_into(&self.connection, table, obj_id, triples)
    }
    // All or nothing: any failing statement rolls back every object.
    pub fn insert_batch(&mut self, table: &str, objects: &[(ObjId, Vec<Triple>)]) -> Result<usize> {
        let table = checked_table(table)?;
        let tx = self.connection.transaction()?;
        let mut inserted = 0;
        for (obj_id, triples) in objects {
            inserted += insert_into(&tx, table, *obj_id, triples)?;
        }
        tx.commit()?;
        debug!(table, objects = objects.len(), rows = inserted, "batch committed");
        Ok(inserted)
    }
    // Only Val is rewritten, the row keeps the Typ it was created with.
    pub fn update_value(&self, table: &str, obj_id: ObjId, attr: &str, val: &str) -> Result<usize> {
        let table = checked_table(table)?;
        let updated = self
            .connection
            .prepare_cached(&format!(
                "
                update {table}
                    set Val = ?
                    where ObjId = ?
                    and Attr = ?
                "
            ))?
            .execute(params![val, obj_id, attr])?;
        Ok(updated)
    }
    pub fn delete_object(&self, table: &str, obj_id: ObjId) -> Result<usize> {
        let table = checked_table(table)?;
        let deleted = self
            .connection
            .prepare_cached(&format!("delete from {table} where ObjId = ?"))?
            .execute([obj_id])?;
        Ok(deleted)
    }
    pub fn delete_object_range(&self, table: &str, min: ObjId, max: ObjId) -> Result<usize> {
        let table = checked_table(table)?;
        let deleted = self
            .connection
            .prepare_cached(&format!("delete from {table} where ? <= ObjId and ObjId <= ?"))?
            .execute([min, max])?;
        Ok(deleted)
    }
    // Val is text, so the bounds compare as text: "9" sorts after "10".
    pub fn delete_attribute_range(
        &self,
        table: &str,
        attr: &str,
        min: &str,
        max: &str,
    ) -> Result<usize> {
        let table = checked_table(table)?;
        let deleted = self
            .connection
            .prepare_cached(&format!(
                "
                delete from {table}
                    where ObjId in (
                        select ObjId from {table}
                            where Attr = ?
                            and ? <= Val
                            and Val <= ?
                    )
                "
            ))?
            .execute(params![attr, min, max])?;
        Ok(deleted)
    }
    pub fn delete_attribute_range_numeric(
        &self,
        table: &str,
        attr: &str,
        min: i64,
        max: i64,
    ) -> Result<usize> {
        let table = checked_table(table)?;
        let deleted = self
            .connection
            .prepare_cached(&format!(
                "
                delete from {table}
                    where ObjId in (
                        select ObjId from {table}
                            where Attr = ?
                            and cast(Val as integer) between ? and ?
                    )
                "
            ))?
            .execute(params![attr, min, max])?;
        Ok(deleted)
    }
}

// Shared by single inserts and batches (a Transaction derefs to a Connection).
// All rows of one object go in as a single statement, so a failing row leaves
// none of them behind.
fn insert_into(
    connection: &Connection,
    table: &str,
    obj_id: ObjId,
    triples: &[Triple],
) -> Result<usize> {
    let placeholders = vec!["(?, ?, ?, ?)"; triples.len()].join(", ");
    let sql = format!("insert into {table} (ObjId, Attr, Val, Typ) values {placeholders}");
    let mut binds: Vec<&dyn ToSql> = Vec::with_capacity(triples.len() * 4);
    for triple in triples {
        binds.push(&obj_id);
        binds.push(&triple.attr);
        binds.push(&triple.val);
        binds.push(&triple.typ);
    }
    let inserted = connection.prepare(&sql)?.execute(binds.as_slice())?;
    debug!(table, obj_id, rows = inserted, "inserted");
    Ok(inserted)
}
