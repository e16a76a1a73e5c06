//! RESP wire format: outbound value encoding and inbound frame detection.
//!
//! The framer is a pure function over the inbound buffer. It either finds one
//! complete frame (and reports how many bytes it consumed) or asks for more
//! bytes; it never allocates beyond the parsed slice bounds and rejects
//! malformed lengths so the connection can be closed fail-fast.

use thiserror::Error;

/// Upper bound on a single bulk string payload (matches the usual
/// proto-max-bulk-len of 512 MiB).
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Upper bound on the element count of an inbound command array.
const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// Upper bound on an inline command line before the terminator arrives.
const MAX_INLINE_LEN: usize = 64 * 1024;

/// Errors raised while framing inbound bytes.
///
/// Every variant is unrecoverable for the byte stream that produced it: the
/// caller closes the connection rather than attempting to resynchronise.
#[derive(Error, Debug, PartialEq)]
pub enum FrameError {
    #[error("invalid array length")]
    InvalidArrayLength,
    #[error("invalid bulk string length")]
    InvalidBulkLength,
    #[error("expected bulk string")]
    ExpectedBulkString,
    #[error("bulk string not terminated")]
    UnterminatedBulkString,
    #[error("inline command too long")]
    InlineTooLong,
}

/// One complete inbound frame: the number of buffer bytes it occupied and the
/// command arguments it carried (verb first).
#[derive(Debug, PartialEq)]
pub struct Frame {
    pub consumed: usize,
    pub args: Vec<Vec<u8>>,
}

/// Attempts to extract one complete frame from the front of `buffer`.
///
/// A frame is either an array of bulk strings (`*N\r\n` followed by N
/// `$L\r\n<bytes>\r\n` items) or, as a fallback, a single inline line of the
/// form `TOKEN[ ARG]\r\n`.
///
/// # Returns
///
/// * `Ok(Some(frame))` - A complete frame was found
/// * `Ok(None)` - The buffer holds only a prefix of a frame; read more bytes
/// * `Err(FrameError)` - The buffer is malformed and the stream unrecoverable
pub fn parse_frame(buffer: &[u8]) -> Result<Option<Frame>, FrameError> {
    if buffer.is_empty() {
        return Ok(None);
    }

    if buffer[0] == b'*' {
        parse_array_frame(buffer)
    } else {
        parse_inline_frame(buffer)
    }
}

fn parse_array_frame(buffer: &[u8]) -> Result<Option<Frame>, FrameError> {
    let Some(header_end) = find_crlf(buffer, 0) else {
        return Ok(None);
    };

    let count = parse_decimal(&buffer[1..header_end]).ok_or(FrameError::InvalidArrayLength)?;

    if count < 0 || count > MAX_ARRAY_LEN {
        return Err(FrameError::InvalidArrayLength);
    }

    let mut pos = header_end + 2;
    let mut args = Vec::with_capacity(count as usize);

    for _ in 0..count {
        if pos >= buffer.len() {
            return Ok(None);
        }

        if buffer[pos] != b'$' {
            return Err(FrameError::ExpectedBulkString);
        }

        let Some(len_end) = find_crlf(buffer, pos) else {
            return Ok(None);
        };

        let len = parse_decimal(&buffer[pos + 1..len_end]).ok_or(FrameError::InvalidBulkLength)?;

        if len < 0 || len > MAX_BULK_LEN {
            return Err(FrameError::InvalidBulkLength);
        }

        let data_start = len_end + 2;
        let data_end = data_start + len as usize;

        if data_end + 2 > buffer.len() {
            return Ok(None);
        }

        if &buffer[data_end..data_end + 2] != b"\r\n" {
            return Err(FrameError::UnterminatedBulkString);
        }

        args.push(buffer[data_start..data_end].to_vec());
        pos = data_end + 2;
    }

    Ok(Some(Frame {
        consumed: pos,
        args,
    }))
}

/// Inline fallback: a single `TOKEN[ ARG]\r\n` line. The first space splits
/// the verb from one argument; a blank line yields an empty frame that the
/// dispatcher ignores.
fn parse_inline_frame(buffer: &[u8]) -> Result<Option<Frame>, FrameError> {
    let Some(line_end) = find_crlf(buffer, 0) else {
        if buffer.len() > MAX_INLINE_LEN {
            return Err(FrameError::InlineTooLong);
        }
        return Ok(None);
    };

    let line = trim_spaces(&buffer[..line_end]);
    let consumed = line_end + 2;

    if line.is_empty() {
        return Ok(Some(Frame {
            consumed,
            args: Vec::new(),
        }));
    }

    let mut args = Vec::with_capacity(2);
    match line.iter().position(|&b| b == b' ') {
        Some(space) => {
            args.push(line[..space].to_vec());
            let rest = trim_spaces(&line[space + 1..]);
            if !rest.is_empty() {
                args.push(rest.to_vec());
            }
        }
        None => args.push(line.to_vec()),
    }

    Ok(Some(Frame { consumed, args }))
}

fn find_crlf(buffer: &[u8], from: usize) -> Option<usize> {
    buffer[from..]
        .windows(2)
        .position(|window| window == b"\r\n")
        .map(|offset| from + offset)
}

fn trim_spaces(mut line: &[u8]) -> &[u8] {
    while let [b' ', rest @ ..] = line {
        line = rest;
    }
    while let [rest @ .., b' '] = line {
        line = rest;
    }
    line
}

/// Strict decimal parser for protocol lengths: optional minus sign, at least
/// one digit, nothing else.
fn parse_decimal(digits: &[u8]) -> Option<i64> {
    let (negative, digits) = match digits {
        [b'-', rest @ ..] => (true, rest),
        _ => (false, digits),
    };

    if digits.is_empty() || digits.len() > 19 {
        return None;
    }

    let mut value: i64 = 0;
    for &byte in digits {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add((byte - b'0') as i64)?;
    }

    Some(if negative { -value } else { value })
}

/// A RESP value the server can send back to a client.
///
/// Bulk strings carry raw bytes: keys, list elements, and stream fields are
/// binary-safe and must survive encoding untouched.
#[derive(Debug, PartialEq, Clone)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Vec<u8>),
    NullBulkString,
    Array(Vec<RespValue>),
    NullArray,
}

impl RespValue {
    /// Encodes the value into its wire representation.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(text) => {
                out.push(b'+');
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            RespValue::Error(text) => {
                out.push(b'-');
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            RespValue::Integer(value) => {
                out.push(b':');
                out.extend_from_slice(value.to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            RespValue::BulkString(bytes) => {
                out.push(b'$');
                out.extend_from_slice(bytes.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(bytes);
                out.extend_from_slice(b"\r\n");
            }
            RespValue::NullBulkString => out.extend_from_slice(b"$-1\r\n"),
            RespValue::Array(elements) => {
                out.push(b'*');
                out.extend_from_slice(elements.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for element in elements {
                    element.encode_into(out);
                }
            }
            RespValue::NullArray => out.extend_from_slice(b"*-1\r\n"),
        }
    }

    /// Builds the `[key, element]` array reply shared by immediate and woken
    /// blocking pops.
    pub fn key_element_array(key: &[u8], element: &[u8]) -> RespValue {
        RespValue::Array(vec![
            RespValue::BulkString(key.to_vec()),
            RespValue::BulkString(element.to_vec()),
        ])
    }
}
