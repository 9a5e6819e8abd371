//! `Variant`: the opaque, self-describing value used for call args and
//! results on the wire. Preserves byte buffers unchanged through encode/decode,
//! including when nested inside lists and maps (§8 scenario S5).

use std::collections::BTreeMap;

use super::varint::{read_bytes, read_string, read_varuint, write_bytes, write_string, write_varuint};

const TAG_NULL: u8 = 0;
const TAG_BOOL_FALSE: u8 = 1;
const TAG_BOOL_TRUE: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_STRING: u8 = 5;
const TAG_BYTES: u8 = 6;
const TAG_LIST: u8 = 7;
const TAG_MAP: u8 = 8;

/// A dynamically-typed, self-describing argument/result value.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Variant>),
    Map(BTreeMap<String, Variant>),
}

impl Variant {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Variant::Null => buf.push(TAG_NULL),
            Variant::Bool(false) => buf.push(TAG_BOOL_FALSE),
            Variant::Bool(true) => buf.push(TAG_BOOL_TRUE),
            Variant::Int(v) => {
                buf.push(TAG_INT);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Variant::Float(v) => {
                buf.push(TAG_FLOAT);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Variant::Str(s) => {
                buf.push(TAG_STRING);
                write_string(buf, s);
            }
            Variant::Bytes(b) => {
                buf.push(TAG_BYTES);
                write_bytes(buf, b);
            }
            Variant::List(items) => {
                buf.push(TAG_LIST);
                write_varuint(buf, items.len() as u64);
                for item in items {
                    item.encode(buf);
                }
            }
            Variant::Map(entries) => {
                buf.push(TAG_MAP);
                write_varuint(buf, entries.len() as u64);
                for (k, v) in entries {
                    write_string(buf, k);
                    v.encode(buf);
                }
            }
        }
    }

    pub fn decode(buf: &[u8], cursor: &mut usize) -> Option<Variant> {
        let tag = *buf.get(*cursor)?;
        *cursor += 1;
        match tag {
            TAG_NULL => Some(Variant::Null),
            TAG_BOOL_FALSE => Some(Variant::Bool(false)),
            TAG_BOOL_TRUE => Some(Variant::Bool(true)),
            TAG_INT => {
                let bytes = buf.get(*cursor..*cursor + 8)?;
                *cursor += 8;
                Some(Variant::Int(i64::from_be_bytes(bytes.try_into().ok()?)))
            }
            TAG_FLOAT => {
                let bytes = buf.get(*cursor..*cursor + 8)?;
                *cursor += 8;
                Some(Variant::Float(f64::from_be_bytes(bytes.try_into().ok()?)))
            }
            TAG_STRING => read_string(buf, cursor).map(Variant::Str),
            TAG_BYTES => read_bytes(buf, cursor).map(Variant::Bytes),
            TAG_LIST => {
                let count = read_varuint(buf, cursor)?;
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    items.push(Variant::decode(buf, cursor)?);
                }
                Some(Variant::List(items))
            }
            TAG_MAP => {
                let count = read_varuint(buf, cursor)?;
                let mut entries = BTreeMap::new();
                for _ in 0..count {
                    let key = read_string(buf, cursor)?;
                    let value = Variant::decode(buf, cursor)?;
                    entries.insert(key, value);
                }
                Some(Variant::Map(entries))
            }
            _ => None,
        }
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::Str(value.to_string())
    }
}

impl From<Vec<u8>> for Variant {
    fn from(value: Vec<u8>) -> Self {
        Variant::Bytes(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Variant::Int(value)
    }
}
