//! Fixed-order binary framing for call/return envelopes (§6 of the distilled
//! spec). Big-endian where multi-byte scalars appear; lengths are varuint;
//! the trailing `error` field is JSON-serialized `ActionError`.
//!
//! Field order is a hard contract: major version, minor version, transport
//! fields, transport-failure fields, tracing fields, remote-call fields,
//! then a call-request or call-return body. Unknown trailing bytes are an
//! error (§9 open question: no forward-compatible trailer yet).

use super::variant::Variant;
use super::varint::{read_string, read_varuint, write_string, write_varuint};
use crate::error::ActionError;

const MAJOR_VERSION: u8 = b'0';
const MINOR_VERSION: u8 = 0;

const KIND_CALL: u8 = b'c';
const KIND_RETURN: u8 = b'r';

const BOOL_TRUE: u8 = b't';
const BOOL_FALSE: u8 = b'f';

const PRESENT: u8 = 1;
const ABSENT: u8 = 0;

#[derive(Debug, Clone, PartialEq)]
pub enum CallKind {
    Call,
    Return,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeBody {
    Call {
        lazy: bool,
        actor_type: String,
        action_name: String,
        id_parts: Vec<String>,
        args: Vec<Variant>,
    },
    Return {
        result: Option<Variant>,
        error: Option<ActionError>,
    },
}

/// One frame of the wire protocol: transport envelope plus call body.
#[derive(Debug, Clone, PartialEq)]
pub struct WireEnvelope {
    pub receiver: String,
    pub return_address: Option<String>,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
    pub correlation_ids: Option<Vec<String>>,
    pub parent_uid: Option<String>,
    pub call_id: String,
    pub body: EnvelopeBody,
}

impl WireEnvelope {
    pub fn kind(&self) -> CallKind {
        match self.body {
            EnvelopeBody::Call { .. } => CallKind::Call,
            EnvelopeBody::Return { .. } => CallKind::Return,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum WireError {
    #[error("unsupported major version byte {0:#04x}")]
    UnsupportedMajorVersion(u8),
    #[error("buffer truncated while decoding field {0}")]
    Truncated(&'static str),
    #[error("unrecognized call kind byte {0:#04x}")]
    UnrecognizedKind(u8),
    #[error("malformed boolean byte {0:#04x}")]
    MalformedBool(u8),
    #[error("trailing bytes after decoding a complete frame")]
    TrailingBytes,
    #[error("error field is not valid JSON: {0}")]
    MalformedErrorJson(String),
}

pub fn encode(envelope: &WireEnvelope) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.push(MAJOR_VERSION);
    buf.push(MINOR_VERSION);

    write_string(&mut buf, &envelope.receiver);
    write_option_string(&mut buf, envelope.return_address.as_deref());

    write_option_string(&mut buf, envelope.failure_code.as_deref());
    write_option_string(&mut buf, envelope.failure_message.as_deref());

    match &envelope.correlation_ids {
        Some(ids) => {
            buf.push(PRESENT);
            write_varuint(&mut buf, ids.len() as u64);
            for id in ids {
                write_string(&mut buf, id);
            }
        }
        None => buf.push(ABSENT),
    }
    write_option_string(&mut buf, envelope.parent_uid.as_deref());

    write_string(&mut buf, &envelope.call_id);
    buf.push(match envelope.kind() {
        CallKind::Call => KIND_CALL,
        CallKind::Return => KIND_RETURN,
    });

    match &envelope.body {
        EnvelopeBody::Call {
            lazy,
            actor_type,
            action_name,
            id_parts,
            args,
        } => {
            buf.push(if *lazy { BOOL_TRUE } else { BOOL_FALSE });
            write_string(&mut buf, actor_type);
            write_string(&mut buf, action_name);
            write_varuint(&mut buf, id_parts.len() as u64);
            for part in id_parts {
                write_string(&mut buf, part);
            }
            write_varuint(&mut buf, args.len() as u64);
            for arg in args {
                arg.encode(&mut buf);
            }
        }
        EnvelopeBody::Return { result, error } => {
            match result {
                Some(v) => {
                    buf.push(PRESENT);
                    v.encode(&mut buf);
                }
                None => buf.push(ABSENT),
            }
            match error {
                Some(e) => {
                    let json = serde_json::to_string(e).unwrap_or_default();
                    buf.push(PRESENT);
                    write_string(&mut buf, &json);
                }
                None => buf.push(ABSENT),
            }
        }
    }

    buf
}

pub fn decode(buf: &[u8]) -> Result<WireEnvelope, WireError> {
    let mut cursor = 0usize;

    let major = *buf.get(cursor).ok_or(WireError::Truncated("major_version"))?;
    cursor += 1;
    if major != MAJOR_VERSION {
        return Err(WireError::UnsupportedMajorVersion(major));
    }
    let _minor = *buf.get(cursor).ok_or(WireError::Truncated("minor_version"))?;
    cursor += 1;

    let receiver = read_string(buf, &mut cursor).ok_or(WireError::Truncated("receiver"))?;
    let return_address = read_option_string(buf, &mut cursor, "return_address")?;

    let failure_code = read_option_string(buf, &mut cursor, "failure_code")?;
    let failure_message = read_option_string(buf, &mut cursor, "failure_message")?;

    let present = next_byte(buf, &mut cursor, "correlation_ids_present")?;
    let correlation_ids = match present {
        PRESENT => {
            let count = read_varuint(buf, &mut cursor).ok_or(WireError::Truncated("correlation_ids_count"))?;
            let mut ids = Vec::with_capacity(count as usize);
            for _ in 0..count {
                ids.push(read_string(buf, &mut cursor).ok_or(WireError::Truncated("correlation_id"))?);
            }
            Some(ids)
        }
        ABSENT => None,
        other => return Err(WireError::MalformedBool(other)),
    };
    let parent_uid = read_option_string(buf, &mut cursor, "parent_uid")?;

    let call_id = read_string(buf, &mut cursor).ok_or(WireError::Truncated("call_id"))?;
    let kind_byte = next_byte(buf, &mut cursor, "kind")?;

    let body = match kind_byte {
        KIND_CALL => {
            let lazy_byte = next_byte(buf, &mut cursor, "lazy")?;
            let lazy = match lazy_byte {
                BOOL_TRUE => true,
                BOOL_FALSE => false,
                other => return Err(WireError::MalformedBool(other)),
            };
            let actor_type = read_string(buf, &mut cursor).ok_or(WireError::Truncated("actor_type"))?;
            let action_name = read_string(buf, &mut cursor).ok_or(WireError::Truncated("action_name"))?;
            let id_count = read_varuint(buf, &mut cursor).ok_or(WireError::Truncated("id_part_count"))?;
            let mut id_parts = Vec::with_capacity(id_count as usize);
            for _ in 0..id_count {
                id_parts.push(read_string(buf, &mut cursor).ok_or(WireError::Truncated("id_part"))?);
            }
            let arg_count = read_varuint(buf, &mut cursor).ok_or(WireError::Truncated("arg_count"))?;
            let mut args = Vec::with_capacity(arg_count as usize);
            for _ in 0..arg_count {
                args.push(Variant::decode(buf, &mut cursor).ok_or(WireError::Truncated("arg"))?);
            }
            EnvelopeBody::Call {
                lazy,
                actor_type,
                action_name,
                id_parts,
                args,
            }
        }
        KIND_RETURN => {
            let result_present = next_byte(buf, &mut cursor, "result_present")?;
            let result = match result_present {
                PRESENT => Some(Variant::decode(buf, &mut cursor).ok_or(WireError::Truncated("result"))?),
                ABSENT => None,
                other => return Err(WireError::MalformedBool(other)),
            };
            let error_present = next_byte(buf, &mut cursor, "error_present")?;
            let error = match error_present {
                PRESENT => {
                    let json = read_string(buf, &mut cursor).ok_or(WireError::Truncated("error"))?;
                    let parsed: ActionError = serde_json::from_str(&json)
                        .map_err(|e| WireError::MalformedErrorJson(e.to_string()))?;
                    Some(parsed)
                }
                ABSENT => None,
                other => return Err(WireError::MalformedBool(other)),
            };
            EnvelopeBody::Return { result, error }
        }
        other => return Err(WireError::UnrecognizedKind(other)),
    };

    if cursor != buf.len() {
        return Err(WireError::TrailingBytes);
    }

    Ok(WireEnvelope {
        receiver,
        return_address,
        failure_code,
        failure_message,
        correlation_ids,
        parent_uid,
        call_id,
        body,
    })
}

fn write_option_string(buf: &mut Vec<u8>, value: Option<&str>) {
    match value {
        Some(s) => {
            buf.push(PRESENT);
            write_string(buf, s);
        }
        None => buf.push(ABSENT),
    }
}

fn read_option_string(buf: &[u8], cursor: &mut usize, field: &'static str) -> Result<Option<String>, WireError> {
    let present = next_byte(buf, cursor, field)?;
    match present {
        PRESENT => Ok(Some(read_string(buf, cursor).ok_or(WireError::Truncated(field))?)),
        ABSENT => Ok(None),
        other => Err(WireError::MalformedBool(other)),
    }
}

fn next_byte(buf: &[u8], cursor: &mut usize, field: &'static str) -> Result<u8, WireError> {
    let byte = *buf.get(*cursor).ok_or(WireError::Truncated(field))?;
    *cursor += 1;
    Ok(byte)
}
