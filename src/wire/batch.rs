//! Per-receiver message batching for the NATS-like bus transport (§6):
//! `"len1,len2,…\n" || concat(messages)`.

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum BatchError {
    #[error("batch header missing newline separator")]
    MissingNewline,
    #[error("batch header contains a non-numeric length")]
    MalformedLength,
    #[error("batch body shorter than the sum of declared lengths")]
    Truncated,
    #[error("batch body longer than the sum of declared lengths")]
    TrailingBytes,
}

/// Frame a set of already-encoded messages destined for one receiver into a
/// single batch buffer.
pub fn encode_batch(messages: &[Vec<u8>]) -> Vec<u8> {
    let header = messages
        .iter()
        .map(|m| m.len().to_string())
        .collect::<Vec<_>>()
        .join(",");
    let mut out = Vec::with_capacity(header.len() + 1 + messages.iter().map(Vec::len).sum::<usize>());
    out.extend_from_slice(header.as_bytes());
    out.push(b'\n');
    for m in messages {
        out.extend_from_slice(m);
    }
    out
}

/// Split a batch buffer back into its constituent messages.
pub fn decode_batch(buf: &[u8]) -> Result<Vec<Vec<u8>>, BatchError> {
    let newline_at = buf.iter().position(|b| *b == b'\n').ok_or(BatchError::MissingNewline)?;
    let header = std::str::from_utf8(&buf[..newline_at]).map_err(|_| BatchError::MalformedLength)?;
    let lengths: Vec<usize> = if header.is_empty() {
        Vec::new()
    } else {
        header
            .split(',')
            .map(|s| s.parse::<usize>().map_err(|_| BatchError::MalformedLength))
            .collect::<Result<_, _>>()?
    };

    let mut messages = Vec::with_capacity(lengths.len());
    let mut offset = newline_at + 1;
    for len in lengths {
        let end = offset.checked_add(len).ok_or(BatchError::Truncated)?;
        let slice = buf.get(offset..end).ok_or(BatchError::Truncated)?;
        messages.push(slice.to_vec());
        offset = end;
    }
    if offset != buf.len() {
        return Err(BatchError::TrailingBytes);
    }
    Ok(messages)
}
