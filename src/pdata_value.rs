use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use smol_str::SmolStr;
use std::collections::BTreeMap;

/// Struct-valued payloads and sparse index maps. Key order is lexical.
pub type ObjectMap = BTreeMap<SmolStr, PdataValue>;

// ─── PdataNumber ────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq)]
pub enum PdataNumber {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl std::fmt::Debug for PdataNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PdataNumber::I64(i) => write!(f, "I64({})", i),
            PdataNumber::U64(u) => write!(f, "U64({})", u),
            PdataNumber::F64(v) => write!(f, "F64({})", v),
        }
    }
}

// ─── PdataValue ─────────────────────────────────────────────────────────────

/// One decoded pdata value: a scalar, a struct object, or an array.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PdataValue {
    #[default]
    Null,
    Bool(bool),
    Number(PdataNumber),
    Str(SmolStr),
    Array(Vec<PdataValue>),
    Object(ObjectMap),
}

// ─── Serialize (CBOR payloads inside the codec) ─────────────────────────────

impl Serialize for PdataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PdataValue::Null => serializer.serialize_none(),
            PdataValue::Bool(b) => serializer.serialize_bool(*b),
            PdataValue::Number(n) => match n {
                PdataNumber::I64(i) => serializer.serialize_i64(*i),
                PdataNumber::U64(u) => serializer.serialize_u64(*u),
                PdataNumber::F64(f) => serializer.serialize_f64(*f),
            },
            PdataValue::Str(s) => serializer.serialize_str(s.as_str()),
            PdataValue::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for v in arr {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            PdataValue::Object(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    m.serialize_entry(k.as_str(), v)?;
                }
                m.end()
            }
        }
    }
}

// ─── From impls ─────────────────────────────────────────────────────────────

impl From<f64> for PdataValue {
    fn from(n: f64) -> Self {
        PdataValue::Number(PdataNumber::F64(n))
    }
}

impl From<i64> for PdataValue {
    fn from(n: i64) -> Self {
        PdataValue::Number(PdataNumber::I64(n))
    }
}

impl From<u64> for PdataValue {
    fn from(n: u64) -> Self {
        PdataValue::Number(PdataNumber::U64(n))
    }
}

impl From<bool> for PdataValue {
    fn from(b: bool) -> Self {
        PdataValue::Bool(b)
    }
}

impl From<&str> for PdataValue {
    fn from(s: &str) -> Self {
        PdataValue::Str(SmolStr::from(s))
    }
}

impl From<SmolStr> for PdataValue {
    fn from(s: SmolStr) -> Self {
        PdataValue::Str(s)
    }
}

impl<T: Into<PdataValue>> From<Vec<T>> for PdataValue {
    fn from(items: Vec<T>) -> Self {
        PdataValue::Array(items.into_iter().map(Into::into).collect())
    }
}

// ─── From/Into cbor4ii::core::Value ─────────────────────────────────────────

impl From<cbor4ii::core::Value> for PdataValue {
    fn from(v: cbor4ii::core::Value) -> Self {
        match v {
            cbor4ii::core::Value::Null => PdataValue::Null,
            cbor4ii::core::Value::Bool(b) => PdataValue::Bool(b),
            cbor4ii::core::Value::Integer(i) => {
                if let Ok(val) = i64::try_from(i) {
                    PdataValue::Number(PdataNumber::I64(val))
                } else if let Ok(val) = u64::try_from(i) {
                    PdataValue::Number(PdataNumber::U64(val))
                } else {
                    PdataValue::Number(PdataNumber::F64(i as f64))
                }
            }
            cbor4ii::core::Value::Float(f) => PdataValue::Number(PdataNumber::F64(f)),
            cbor4ii::core::Value::Text(s) => PdataValue::Str(SmolStr::from(s)),
            cbor4ii::core::Value::Array(arr) => {
                PdataValue::Array(arr.into_iter().map(PdataValue::from).collect())
            }
            cbor4ii::core::Value::Map(entries) => PdataValue::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| {
                        let key = match k {
                            cbor4ii::core::Value::Text(s) => SmolStr::from(s),
                            cbor4ii::core::Value::Integer(i) => SmolStr::from(i.to_string()),
                            other => SmolStr::from(format!("{:?}", other)),
                        };
                        (key, PdataValue::from(v))
                    })
                    .collect(),
            ),
            _ => PdataValue::Null,
        }
    }
}

// ─── From/Into serde_json::Value (delta records at rest) ────────────────────

impl From<serde_json::Value> for PdataValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => PdataValue::Null,
            serde_json::Value::Bool(b) => PdataValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PdataValue::Number(PdataNumber::I64(i))
                } else if let Some(u) = n.as_u64() {
                    PdataValue::Number(PdataNumber::U64(u))
                } else {
                    PdataValue::Number(PdataNumber::F64(n.as_f64().unwrap_or(0.0)))
                }
            }
            serde_json::Value::String(s) => PdataValue::Str(SmolStr::from(s)),
            serde_json::Value::Array(arr) => {
                PdataValue::Array(arr.into_iter().map(PdataValue::from).collect())
            }
            serde_json::Value::Object(obj) => PdataValue::Object(
                obj.into_iter()
                    .map(|(k, v)| (SmolStr::from(k), PdataValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<PdataValue> for serde_json::Value {
    fn from(val: PdataValue) -> Self {
        match val {
            PdataValue::Null => serde_json::Value::Null,
            PdataValue::Bool(b) => serde_json::Value::Bool(b),
            PdataValue::Number(n) => match n {
                PdataNumber::I64(i) => serde_json::json!(i),
                PdataNumber::U64(u) => serde_json::json!(u),
                PdataNumber::F64(f) => serde_json::json!(f),
            },
            PdataValue::Str(s) => serde_json::Value::String(s.to_string()),
            PdataValue::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(|v| v.into()).collect())
            }
            PdataValue::Object(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k.to_string(), v.into()))
                    .collect(),
            ),
        }
    }
}
