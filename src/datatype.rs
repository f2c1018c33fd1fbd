// used for timestamps in the database
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
// used to (de)serialize records and timestamps
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
// generic key/value bags arrive as parsed JSON
use serde_json::Value as Json;

// used when parsing a string to a Time
use std::str::FromStr;
// used to print out readable forms of a value
use std::fmt;

use tracing::warn;

use crate::error::VertableError;

// ------------- Type tags -------------
pub const INT: &str = "int";
pub const INT64: &str = "int64";
pub const BOOL: &str = "bool";
pub const STRING: &str = "string";
pub const TIME: &str = "Time";
pub const QUALIFIED_TIME: &str = "time.Time";
// tags used for JSON leftovers that have no native counterpart
pub const NIL: &str = "nil";
pub const JSON: &str = "json";

// Stored timestamps look like "2024-05-01 13:45:00 +0000 UTC", with a
// fraction such as ".25" after the seconds only when there is one.
pub const STORAGE_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.f";
pub const ZONE_SUFFIX: &str = " +0000 UTC";

// Layouts accepted when parsing a timestamp given as text, tried in order
// after RFC 3339. All of them are read as UTC.
const LAYOUTS: [&str; 7] = [
    "%Y-%m-%dT%H:%MZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.3fZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.3f",
];

// ------------- Time -------------
/// A UTC timestamp. Serializes as RFC 3339 and parses from RFC 3339 or any of
/// a fixed list of ISO 8601-like layouts.
#[derive(Eq, PartialEq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct Time(DateTime<Utc>);

impl Time {
    pub fn now() -> Time {
        Time(Utc::now())
    }
    pub fn from_unix(seconds: i64) -> Option<Time> {
        DateTime::from_timestamp(seconds, 0).map(Time)
    }
    pub fn parse(text: &str) -> Result<Time, VertableError> {
        if let Ok(moment) = DateTime::parse_from_rfc3339(text) {
            return Ok(Time(moment.with_timezone(&Utc)));
        }
        LAYOUTS
            .iter()
            .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
            .map(Time::from)
            .ok_or_else(|| VertableError::InvalidDate(text.to_string()))
    }
    pub fn unix(&self) -> i64 {
        self.0.timestamp()
    }
    pub fn utc(&self) -> DateTime<Utc> {
        self.0
    }
    fn to_storage(self) -> String {
        format!("{}{}", self.0.format(STORAGE_LAYOUT), ZONE_SUFFIX)
    }
    fn from_storage(text: &str) -> Option<Time> {
        let text = text.strip_suffix(ZONE_SUFFIX).unwrap_or(text);
        match NaiveDateTime::parse_from_str(text, STORAGE_LAYOUT) {
            Ok(moment) => Some(Time::from(moment)),
            Err(err) => {
                warn!(value = text, error = %err, "unreadable stored timestamp");
                None
            }
        }
    }
}
impl From<DateTime<Utc>> for Time {
    fn from(moment: DateTime<Utc>) -> Time {
        Time(moment)
    }
}
impl From<NaiveDateTime> for Time {
    fn from(moment: NaiveDateTime) -> Time {
        Time(Utc.from_utc_datetime(&moment))
    }
}
impl FromStr for Time {
    type Err = VertableError;
    fn from_str(s: &str) -> Result<Time, VertableError> {
        Time::parse(s)
    }
}
impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}
impl Serialize for Time {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
impl<'de> Deserialize<'de> for Time {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Time, D::Error> {
        let text = String::deserialize(deserializer)?;
        Time::parse(&text).map_err(de::Error::custom)
    }
}

// ------------- Value -------------
/// A dynamically typed attribute value.
///
/// `Float` is accepted on the way in (parsed JSON surfaces numbers as floats)
/// but is stored under the `int` tag, so it never comes back out of a read.
/// `Other` keeps a caller-chosen tag verbatim; reading an unknown tag yields
/// the raw text as a `String`.
#[derive(PartialEq, Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Time(Time),
    Float(f64),
    Other { typ: String, val: String },
}

impl Value {
    pub fn type_tag(&self) -> &str {
        match self {
            Value::Int(_) | Value::Float(_) => INT,
            Value::Bool(_) => BOOL,
            Value::String(_) => STRING,
            Value::Time(_) => TIME,
            Value::Other { typ, .. } => typ.as_str(),
        }
    }
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_time(&self) -> Option<Time> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }
}

/// Turns a value into its stored `(Val, Typ)` pair. Never fails.
pub fn encode(value: &Value) -> (String, String) {
    let val = match value {
        Value::Time(t) => t.to_storage(),
        Value::Other { val, .. } => val.clone(),
        other => other.to_string(),
    };
    (val, value.type_tag().to_string())
}

/// Reads a stored `(Val, Typ)` pair back. `None` means the attribute should be
/// left out of the record (an unreadable timestamp); an unreadable integer
/// degrades to zero.
pub fn decode(val: &str, typ: &str) -> Option<Value> {
    match typ {
        INT | INT64 => Some(Value::Int(val.parse().unwrap_or_else(|_| {
            warn!(value = val, "unreadable stored integer, using 0");
            0
        }))),
        BOOL => Some(Value::Bool(val == "true")),
        STRING => Some(Value::String(val.to_string())),
        TIME | QUALIFIED_TIME => Time::from_storage(val).map(Value::Time),
        _ => Some(Value::String(val.to_string())),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Time(t) => write!(f, "{}", t),
            Value::Float(x) => write!(f, "{}", x),
            Value::Other { val, .. } => write!(f, "{}", val),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Int(i)
    }
}
impl From<i32> for Value {
    fn from(i: i32) -> Value {
        Value::Int(i64::from(i))
    }
}
impl From<u32> for Value {
    fn from(i: u32) -> Value {
        Value::Int(i64::from(i))
    }
}
impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Float(x)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}
impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.to_string())
    }
}
impl From<Time> for Value {
    fn from(t: Time) -> Value {
        Value::Time(t)
    }
}
impl From<DateTime<Utc>> for Value {
    fn from(moment: DateTime<Utc>) -> Value {
        Value::Time(Time::from(moment))
    }
}
impl From<&Json> for Value {
    fn from(json: &Json) -> Value {
        match json {
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Null => Value::Other {
                typ: NIL.to_string(),
                val: "<nil>".to_string(),
            },
            nested => Value::Other {
                typ: JSON.to_string(),
                val: nested.to_string(),
            },
        }
    }
}
impl From<Json> for Value {
    fn from(json: Json) -> Value {
        Value::from(&json)
    }
}
