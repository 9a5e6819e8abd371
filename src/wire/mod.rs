//! Wire protocol: fixed-order framing for control fields plus variant
//! payloads (§6 of the distilled spec).
//!
//! - `varint` — LEB128 varuint and length-prefixed string/byte primitives.
//! - `variant` — the self-describing `Variant` value used for args/results.
//! - `codec` — the full call/return envelope encoder/decoder.
//! - `batch` — the NATS-like bus's `"len1,len2,...\n" || concat(messages)` framing.

pub mod batch;
pub mod codec;
pub mod variant;
pub mod varint;

pub use codec::{decode, encode, CallKind, EnvelopeBody, WireEnvelope, WireError};
pub use variant::Variant;
