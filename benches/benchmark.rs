use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use vertable::construct::{assemble, Database, PersistenceMode, Record, Row};
use vertable::datatype::{encode, Time, Value};

fn rows(objects: i64, attributes: i64) -> Vec<Row> {
    let mut rows = Vec::new();
    let when = Time::from_unix(1_600_000_000).unwrap();
    for obj_id in 1..=objects {
        for a in 0..attributes {
            let value = match a % 4 {
                0 => Value::Int(a),
                1 => Value::Bool(a % 3 == 0),
                2 => Value::String(format!("value {a}")),
                _ => Value::Time(when),
            };
            let (val, typ) = encode(&value);
            rows.push(Row {
                id: obj_id * attributes + a,
                obj_id,
                attr: format!("attr{a}"),
                val,
                typ,
            });
        }
    }
    rows
}

fn record(i: i64) -> Record {
    let mut record = Record::new();
    record.insert("Name".to_string(), Value::String(format!("member {i}")));
    record.insert("Age".to_string(), Value::Int(20 + i % 50));
    record.insert("Active".to_string(), Value::Bool(i % 2 == 0));
    record
}

fn assembly(c: &mut Criterion) {
    let input = rows(1_000, 8);
    c.bench_function("assemble 1000 objects x 8 attributes", |b| {
        b.iter(|| assemble(black_box(input.clone())))
    });
}

fn insertion(c: &mut Criterion) {
    c.bench_function("insert one record", |b| {
        let db = Database::new(PersistenceMode::InMemory).unwrap();
        db.create_table("bench", false).unwrap();
        let mut i = 0;
        b.iter(|| {
            i += 1;
            db.insert("bench", black_box(&record(i))).unwrap()
        })
    });
    c.bench_function("insert batch of 100 records", |b| {
        let db = Database::new(PersistenceMode::InMemory).unwrap();
        db.create_table("bench", false).unwrap();
        let batch: Vec<Record> = (0..100).map(record).collect();
        b.iter(|| db.insert_batch("bench", black_box(&batch)).unwrap())
    });
}

criterion_group!(benches, assembly, insertion);
criterion_main!(benches);
