//! CBOR to JSON conversion for CWT claim sets.
//!
//! Integer map keys become their decimal string (`65535` for the CWT
//! `status` claim), byte strings become unpadded base64url text and tags are
//! transparent.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ciborium::Value as Cbor;
use serde_json::{Map, Number, Value};

use crate::error::EnvelopeError;

/// Decode a CBOR claim set and convert it to JSON.
pub fn claims_to_json(bytes: &[u8]) -> Result<Value, EnvelopeError> {
    let cbor: Cbor = ciborium::from_reader(bytes)
        .map_err(|e| EnvelopeError::MalformedCwt(format!("invalid CBOR claims: {}", e)))?;
    Ok(to_json(&cbor))
}

/// Convert a CBOR value to JSON.
pub fn to_json(value: &Cbor) -> Value {
    match value {
        Cbor::Integer(i) => {
            let i = i128::from(*i);
            if let Ok(n) = i64::try_from(i) {
                Value::Number(n.into())
            } else if let Ok(n) = u64::try_from(i) {
                Value::Number(n.into())
            } else {
                Value::String(i.to_string())
            }
        }
        Cbor::Bytes(bytes) => Value::String(URL_SAFE_NO_PAD.encode(bytes)),
        Cbor::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Cbor::Text(text) => Value::String(text.clone()),
        Cbor::Bool(b) => Value::Bool(*b),
        Cbor::Null => Value::Null,
        Cbor::Tag(_, inner) => to_json(inner),
        Cbor::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        Cbor::Map(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key_to_string(key), to_json(value));
            }
            Value::Object(map)
        }
        _ => Value::Null,
    }
}

fn key_to_string(key: &Cbor) -> String {
    match key {
        Cbor::Text(text) => text.clone(),
        Cbor::Integer(i) => i128::from(*i).to_string(),
        Cbor::Bool(b) => b.to_string(),
        other => to_json(other).to_string(),
    }
}
