use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

use crate::event::Properties;

/// Content signature of a custom event shape: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventSignature(String);

impl EventSignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EventSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the signature of an event from its type and property set.
///
/// Formula: `sha256("event_type|k1:v1|k2:v2|...")` hex-encoded, with keys in
/// lexicographic order and null-valued keys left out. An empty property set
/// hashes `event_type` alone.
pub fn event_signature(event_type: &str, properties: &Properties) -> EventSignature {
    let mut parts = Vec::with_capacity(properties.len() + 1);
    parts.push(event_type.to_string());
    for (key, value) in properties {
        if let Some(repr) = scalar_repr(value) {
            parts.push(format!("{key}:{repr}"));
        }
    }
    let hash = Sha256::digest(parts.join("|").as_bytes());
    EventSignature(hex::encode(hash))
}

fn scalar_repr(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(number_repr(n)),
        nested => Some(nested.to_string()),
    }
}

/// `1` and `1.0` must hash the same, so integral floats print as integers.
fn number_repr(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
