use vertable::construct::{Database, PersistenceMode, Record, Storable};
use vertable::datatype::Value;
use vertable::error::VertableError;

fn setup() -> Database {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    db.create_table("termcap", false).expect("table");
    db
}

fn entry(name: &str, cols: i64) -> Record {
    let mut record = Record::new();
    record.insert("Name".to_string(), Value::from(name));
    record.insert("Cols".to_string(), Value::Int(cols));
    record
}

// Names the same attribute twice, which the (ObjId, Attr) constraint refuses.
struct Duplicated;
impl Storable for Duplicated {
    fn attributes(&self) -> Vec<(String, Value)> {
        vec![
            ("Name".to_string(), Value::from("first")),
            ("Name".to_string(), Value::from("second")),
        ]
    }
}

#[test]
fn batch_ids_continue_after_the_largest() {
    let db = setup();
    db.insert("termcap", &entry("vt100", 80)).expect("insert");
    let ids = db
        .insert_batch("termcap", &[entry("xterm", 80), entry("linux", 80), entry("wide", 132)])
        .expect("batch");
    assert_eq!(ids, vec![2, 3, 4]);
    let all = db.gets("termcap").expect("gets");
    assert_eq!(all.len(), 4);
    assert_eq!(all[3]["Name"], Value::from("wide"));
    assert_eq!(all[3]["Cols"], Value::Int(132));
}

#[test]
fn empty_batch_stores_nothing() {
    let db = setup();
    let ids = db.insert_batch::<Record>("termcap", &[]).expect("batch");
    assert!(ids.is_empty());
    assert_eq!(db.count_rows("termcap").expect("count"), 0);
}

#[test]
fn failing_batch_is_rolled_back() {
    let db = setup();
    db.insert("termcap", &entry("vt100", 80)).expect("insert");
    let err = db
        .insert_batch("termcap", &[Duplicated, Duplicated])
        .unwrap_err();
    assert!(matches!(err, VertableError::Query(_)));
    assert_eq!(db.count_rows("termcap").expect("count"), 2);
    assert_eq!(db.next_id("termcap").expect("next"), 2);
}

#[test]
fn failure_after_stored_entries_undoes_them() {
    let db = setup();
    let batch: Vec<Box<dyn Storable>> = vec![Box::new(entry("xterm", 80)), Box::new(Duplicated)];
    let err = db.insert_batch("termcap", &batch).unwrap_err();
    assert!(matches!(err, VertableError::Query(_)));
    assert_eq!(db.count_rows("termcap").expect("count"), 0);
}

#[test]
fn batch_with_an_empty_entry_is_refused_up_front() {
    let db = setup();
    let err = db
        .insert_batch("termcap", &[entry("xterm", 80), Record::new()])
        .unwrap_err();
    assert!(matches!(err, VertableError::EmptyRecord(_)));
    assert_eq!(db.count_rows("termcap").expect("count"), 0);
}
