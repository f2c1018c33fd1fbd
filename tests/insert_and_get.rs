use vertable::construct::{Database, PersistenceMode, Record, Storable};
use vertable::datatype::{Time, Value};
use vertable::error::VertableError;
use vertable::storable;

struct Member {
    id: i64,
    name: String,
    birth: String,
}
storable!(Member { id: id, "Name" => name, "Birth" => birth });

fn setup() -> Database {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    db.create_table("demo", false).expect("table");
    db
}

fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(attr, value)| (attr.to_string(), value.clone()))
        .collect()
}

#[test]
fn demo_members_get_consecutive_ids() {
    let db = setup();
    let simba = Member { id: 0, name: "Simba".into(), birth: "99/09/09".into() };
    let stored = db.insert("demo", &simba).expect("insert simba");
    assert_eq!(
        stored,
        record(&[("Id", Value::Int(1)), ("Name", "Simba".into()), ("Birth", "99/09/09".into())])
    );

    let kenny = record(&[("Name", "Kenny".into())]);
    let stored = db.insert("demo", &kenny).expect("insert kenny");
    assert_eq!(stored, record(&[("Id", Value::Int(2)), ("Name", "Kenny".into())]));

    let found = db
        .get_filtered("demo", "Attr='Name' AND Val='Kenny'")
        .expect("filter");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["Id"], Value::Int(2));
}

#[test]
fn caller_id_is_replaced_by_allocated_id() {
    let db = setup();
    let member = Member { id: 42, name: "Muse".into(), birth: "66/06/06".into() };
    let stored = db.insert("demo", &member).expect("insert");
    assert_eq!(stored["Id"], Value::Int(1));
    // Id is synthesized from ObjId, never stored as an attribute row
    assert_eq!(db.count_rows("demo").expect("count"), 2);
    assert!(db.get("demo", 42).expect("get").is_none());
}

#[test]
fn typed_values_survive_a_round_trip() {
    let db = setup();
    let when = Time::parse("2021-03-04 17:05:06").expect("time");
    let input = record(&[
        ("Age", Value::Int(-17)),
        ("Active", Value::Bool(true)),
        ("Retired", Value::Bool(false)),
        ("Motto", Value::from("it's \"quoted\"")),
        ("Joined", Value::Time(when)),
    ]);
    let stored = db.insert("demo", &input).expect("insert");
    let mut expected = input.clone();
    expected.insert("Id".to_string(), Value::Int(1));
    assert_eq!(stored, expected);
    assert_eq!(db.get("demo", 1).expect("get"), Some(expected));
}

#[test]
fn json_bag_numbers_are_stored_as_int() {
    let db = setup();
    let bag = serde_json::json!({
        "Name": "Wade",
        "Age": 30.0,
        "Score": 7,
        "Nick": null,
        "Children": [{ "Name": "Simba" }],
    });
    let bag = bag.as_object().expect("object").clone();
    let stored = db.insert("demo", &bag).expect("insert");
    assert_eq!(stored["Name"], Value::from("Wade"));
    assert_eq!(stored["Age"], Value::Int(30));
    assert_eq!(stored["Score"], Value::Int(7));
    // tags without a native reading come back as their raw text
    assert_eq!(stored["Nick"], Value::from("<nil>"));
    assert_eq!(stored["Children"], Value::from(r#"[{"Name":"Simba"}]"#));
}

#[test]
fn missing_records_read_as_nothing() {
    let db = setup();
    assert_eq!(db.get("demo", 1).expect("get"), None);
    assert!(db.gets("demo").expect("gets").is_empty());
    assert!(db.get_filtered("demo", "Attr='Name'").expect("filter").is_empty());
}

#[test]
fn records_without_attributes_are_rejected() {
    let db = setup();
    let err = db.insert("demo", &Record::new()).unwrap_err();
    assert!(matches!(err, VertableError::EmptyRecord(_)));
    let only_id = record(&[("Id", Value::Int(3))]);
    let err = db.insert("demo", &only_id).unwrap_err();
    assert!(matches!(err, VertableError::EmptyRecord(_)));
    assert_eq!(db.count_rows("demo").expect("count"), 0);
}

// Many attributes, with the first one repeated at the end.
struct Wide;
impl Storable for Wide {
    fn attributes(&self) -> Vec<(String, Value)> {
        let mut attributes: Vec<_> =
            (0..250).map(|i| (format!("a{i}"), Value::Int(i))).collect();
        attributes.push(("a0".to_string(), Value::Int(-1)));
        attributes
    }
}

#[test]
fn failed_insert_leaves_no_rows_behind() {
    let db = setup();
    let err = db.insert("demo", &Wide).unwrap_err();
    assert!(matches!(err, VertableError::Query(_)));
    assert_eq!(db.count_rows("demo").expect("count"), 0);
    assert_eq!(db.next_id("demo").expect("next"), 1);
}

#[test]
fn wide_records_are_stored_whole() {
    let db = setup();
    let wide: Record = (0..250).map(|i| (format!("a{i:03}"), Value::Int(i))).collect();
    let stored = db.insert("demo", &wide).expect("insert");
    assert_eq!(stored.len(), 251);
    assert_eq!(stored["a249"], Value::Int(249));
    assert_eq!(db.count_rows("demo").expect("count"), 250);
}

#[test]
fn gets_returns_every_record_in_id_order() {
    let db = setup();
    for name in ["Simba", "Kenny", "Muse"] {
        db.insert("demo", &record(&[("Name", name.into()), ("Service", "school".into())]))
            .expect("insert");
    }
    let all = db.gets("demo").expect("gets");
    let names: Vec<_> = all.iter().map(|r| r["Name"].clone()).collect();
    assert_eq!(names, vec![Value::from("Simba"), Value::from("Kenny"), Value::from("Muse")]);
    let ids: Vec<_> = all.iter().map(|r| r["Id"].clone()).collect();
    assert_eq!(ids, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    assert!(all.iter().all(|r| r.len() == 3));
}

#[test]
fn next_id_follows_the_largest_obj_id() {
    let db = setup();
    assert_eq!(db.max_id("demo").expect("max"), 0);
    assert_eq!(db.next_id("demo").expect("next"), 1);
    db.insert("demo", &record(&[("Name", "Simba".into())])).expect("insert");
    db.insert("demo", &record(&[("Name", "Kenny".into())])).expect("insert");
    db.delete("demo", 1).expect("delete");
    assert_eq!(db.next_id("demo").expect("next"), 3);
}
