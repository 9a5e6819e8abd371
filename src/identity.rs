//! Actor identity: normalized type names and ordered id-part keys.
//!
//! Grounded on the teacher crate's `util::ids` module (`ActorId`, `ActorAddress`):
//! same "small newtype wrapping an owned value, cheap `Display`, round-trippable"
//! shape, adapted from a single UUID to an ordered vector of opaque id parts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized actor type name.
///
/// Normalization strips `_` and lowercases, so `"Echo_Actor"`, `"echoactor"`
/// and `"ECHOACTOR"` all identify the same type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorType(String);

impl ActorType {
    /// Normalize a raw type name.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized: String = raw
            .as_ref()
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActorType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActorType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// An actor's id: an ordered vector of opaque string parts.
///
/// Parts are never concatenated for hashing or equality purposes — order
/// and count are significant, and a part may contain arbitrary bytes
/// (including NUL and SOH) since keys are length-prefixed, not delimited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ActorId(Vec<String>);

/// Error returned when decoding a malformed id key.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum IdKeyError {
    #[error("id key has odd-length hex string")]
    OddLength,
    #[error("id key contains non-hex byte")]
    InvalidHex,
    #[error("id key length prefix overruns buffer")]
    Truncated,
    #[error("id key has trailing bytes after last part")]
    TrailingBytes,
}

impl ActorId {
    pub fn new(parts: Vec<String>) -> Self {
        Self(parts)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve `bindIdx` semantics: non-negative indexes from the front,
    /// negative indexes from the end (`-1` is the last part).
    pub fn part_at(&self, idx: i64) -> Option<&str> {
        let len = self.0.len() as i64;
        let resolved = if idx < 0 { len + idx } else { idx };
        if resolved < 0 || resolved >= len {
            return None;
        }
        self.0.get(resolved as usize).map(String::as_str)
    }

    /// Encode into a reversible binary key: `varuint(part_count) || (varuint(len) || bytes)*`.
    pub fn encode_key(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        crate::wire::varint::write_varuint(&mut buf, self.0.len() as u64);
        for part in &self.0 {
            let bytes = part.as_bytes();
            crate::wire::varint::write_varuint(&mut buf, bytes.len() as u64);
            buf.extend_from_slice(bytes);
        }
        buf
    }

    /// Decode a binary key produced by [`Self::encode_key`].
    pub fn decode_key(buf: &[u8]) -> Result<Self, IdKeyError> {
        let mut cursor = 0usize;
        let count = crate::wire::varint::read_varuint(buf, &mut cursor)
            .ok_or(IdKeyError::Truncated)?;
        let mut parts = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let len = crate::wire::varint::read_varuint(buf, &mut cursor)
                .ok_or(IdKeyError::Truncated)? as usize;
            let end = cursor
                .checked_add(len)
                .ok_or(IdKeyError::Truncated)?;
            let slice = buf.get(cursor..end).ok_or(IdKeyError::Truncated)?;
            let s = String::from_utf8_lossy(slice).into_owned();
            parts.push(s);
            cursor = end;
        }
        if cursor != buf.len() {
            return Err(IdKeyError::TrailingBytes);
        }
        Ok(Self(parts))
    }

    /// Hex-encoded text form of [`Self::encode_key`], usable as a map key
    /// or log field without embedding raw control bytes.
    pub fn to_text(&self) -> String {
        let bytes = self.encode_key();
        let mut out = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            out.push_str(&format!("{b:02x}"));
        }
        out
    }

    /// Inverse of [`Self::to_text`].
    pub fn from_text(text: &str) -> Result<Self, IdKeyError> {
        if text.len() % 2 != 0 {
            return Err(IdKeyError::OddLength);
        }
        let mut bytes = Vec::with_capacity(text.len() / 2);
        let chars: Vec<char> = text.chars().collect();
        for pair in chars.chunks(2) {
            let s: String = pair.iter().collect();
            let byte = u8::from_str_radix(&s, 16).map_err(|_| IdKeyError::InvalidHex)?;
            bytes.push(byte);
        }
        Self::decode_key(&bytes)
    }
}

impl From<Vec<String>> for ActorId {
    fn from(parts: Vec<String>) -> Self {
        Self(parts)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(","))
    }
}
