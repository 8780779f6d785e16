//! Key-value header block encoding and the reserved keys.

use crate::error::{Error, Result};
use crate::wire::{put_value, Parser, Value};

/// Reserved key, BOOL: whether a trailer block terminates the file.
pub const KEY_TRAILER: &str = "trailer";

/// Reserved key, STRING: a transformer config, `"name"` or `"name args"`.
pub const KEY_TRANSFORMER: &str = "transformer";

/// One parsed key-value pair from the header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub key: String,
    pub value: Value,
}

/// Decode the single packed item of a header block. The entry count and
/// every string length are tagged UINT values.
pub fn decode_header(data: &[u8]) -> Result<Vec<HeaderEntry>> {
    let mut p = Parser::new(data);
    let n = match p.read_value()? {
        Value::Uint(n) => n,
        other => return Err(Error::InvalidValueType(other.tag())),
    };
    let mut entries = Vec::new();
    for _ in 0..n {
        let key = match p.read_value()? {
            Value::String(s) => s,
            other => return Err(Error::InvalidValueType(other.tag())),
        };
        let value = p.read_value()?;
        entries.push(HeaderEntry { key, value });
    }
    Ok(entries)
}

/// Encode entries into header-item bytes, the inverse of [`decode_header`].
pub fn encode_header(entries: &[HeaderEntry]) -> Vec<u8> {
    let mut buf = Vec::new();
    put_value(&mut buf, &Value::Uint(entries.len() as u64));
    for e in entries {
        put_value(&mut buf, &Value::String(e.key.clone()));
        put_value(&mut buf, &e.value);
    }
    buf
}

/// Whether the header declares `trailer = true`. The entry must be BOOL
/// when present.
pub fn has_trailer(entries: &[HeaderEntry]) -> Result<bool> {
    for e in entries {
        if e.key == KEY_TRAILER {
            return match e.value {
                Value::Bool(b) => Ok(b),
                ref other => Err(Error::InvalidValueType(other.tag())),
            };
        }
    }
    Ok(false)
}

/// Every `transformer` entry, in file order.
pub fn transformer_configs(entries: &[HeaderEntry]) -> Result<Vec<String>> {
    let mut configs = Vec::new();
    for e in entries {
        if e.key == KEY_TRANSFORMER {
            match &e.value {
                Value::String(s) => configs.push(s.clone()),
                other => return Err(Error::InvalidValueType(other.tag())),
            }
        }
    }
    Ok(configs)
}
