//! Append-only stream type: id ordering, auto-id resolution, range scans.
//!
//! Stream ids are `(ms, seq)` pairs ordered as unsigned integers. Entries are
//! kept strictly id-increasing, so every scan is a binary search over the
//! ordered entry vector.

use std::fmt;

use thiserror::Error;

use crate::resp::RespValue;

/// A stream entry id: millisecond part and sequence part, ordered
/// lexicographically as unsigned pairs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    /// The minimum id, also used as the `last_id` of an empty stream.
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };

    /// The maximum representable id (the `+` range shorthand).
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        StreamId { ms, seq }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// Errors for stream id parsing and ordering rules.
#[derive(Error, Debug, PartialEq)]
pub enum StreamIdError {
    #[error("ID must be greater than 0-0")]
    Zero,
    #[error("ID equal or smaller than target stream top item")]
    NotGreater,
    #[error("Invalid stream ID specified as stream command argument")]
    Format,
}

/// An XADD id argument after parsing: fully explicit, explicit milliseconds
/// with an auto sequence (`<ms>-*`), or fully auto-generated (`*`).
#[derive(Debug, PartialEq)]
pub enum EntryIdSpec {
    Explicit(StreamId),
    PartialAuto(u64),
    Auto,
}

/// Parses an XADD id argument.
pub fn parse_entry_id(text: &[u8]) -> Result<EntryIdSpec, StreamIdError> {
    if text == b"*" {
        return Ok(EntryIdSpec::Auto);
    }

    let Some(dash) = text.iter().position(|&b| b == b'-') else {
        return Err(StreamIdError::Format);
    };

    let ms = parse_u64(&text[..dash]).ok_or(StreamIdError::Format)?;
    let seq_part = &text[dash + 1..];

    if seq_part == b"*" {
        return Ok(EntryIdSpec::PartialAuto(ms));
    }

    let seq = parse_u64(seq_part).ok_or(StreamIdError::Format)?;
    Ok(EntryIdSpec::Explicit(StreamId::new(ms, seq)))
}

/// Parses an XRANGE lower bound: `-` is the minimum id and a bare `<ms>`
/// means `(ms, 0)`.
pub fn parse_range_start(text: &[u8]) -> Result<StreamId, StreamIdError> {
    if text == b"-" {
        return Ok(StreamId::MIN);
    }
    parse_bound(text, 0)
}

/// Parses an XRANGE upper bound: `+` is the maximum id and a bare `<ms>`
/// means `(ms, u64::MAX)`.
pub fn parse_range_end(text: &[u8]) -> Result<StreamId, StreamIdError> {
    if text == b"+" {
        return Ok(StreamId::MAX);
    }
    parse_bound(text, u64::MAX)
}

/// An XREAD from-id argument: `$` (the stream's last id at park time) or an
/// explicit exclusive lower bound, where a bare `<ms>` means `(ms, 0)`.
#[derive(Debug, PartialEq)]
pub enum FromIdSpec {
    Latest,
    At(StreamId),
}

/// Parses an XREAD from-id argument.
pub fn parse_from_id(text: &[u8]) -> Result<FromIdSpec, StreamIdError> {
    if text == b"$" {
        return Ok(FromIdSpec::Latest);
    }
    parse_bound(text, 0).map(FromIdSpec::At)
}

fn parse_bound(text: &[u8], default_seq: u64) -> Result<StreamId, StreamIdError> {
    match text.iter().position(|&b| b == b'-') {
        None => {
            let ms = parse_u64(text).ok_or(StreamIdError::Format)?;
            Ok(StreamId::new(ms, default_seq))
        }
        Some(dash) => {
            let ms = parse_u64(&text[..dash]).ok_or(StreamIdError::Format)?;
            let seq = parse_u64(&text[dash + 1..]).ok_or(StreamIdError::Format)?;
            Ok(StreamId::new(ms, seq))
        }
    }
}

fn parse_u64(digits: &[u8]) -> Option<u64> {
    if digits.is_empty() || digits.len() > 20 {
        return None;
    }

    let mut value: u64 = 0;
    for &byte in digits {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add((byte - b'0') as u64)?;
    }

    Some(value)
}

/// One stream entry: its id and the field/value pairs in insertion order.
/// Duplicate field names are permitted by the protocol and preserved.
#[derive(Debug, PartialEq, Clone)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: Vec<(Vec<u8>, Vec<u8>)>,
}

/// An append-only stream: entries strictly increasing by id, with the last
/// id cached for O(1) monotonicity checks.
#[derive(Debug, Default, PartialEq)]
pub struct Stream {
    entries: Vec<StreamEntry>,
    last_id: StreamId,
}

impl Stream {
    pub fn new() -> Self {
        Stream::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The id of the newest entry, or `0-0` for an empty stream.
    pub fn last_id(&self) -> StreamId {
        self.last_id
    }

    /// Appends an entry, resolving auto ids against the stream's tail.
    ///
    /// `now_ms` supplies the wall-clock millisecond timestamp for fully auto
    /// ids; when the clock has gone backwards relative to the tail, the id is
    /// bumped to `last_ms` with the next sequence so the regression is never
    /// surfaced to the client.
    ///
    /// # Returns
    ///
    /// * `Ok(StreamId)` - The resolved id of the appended entry
    /// * `Err(StreamIdError::Zero)` - An explicit id of `0-0`
    /// * `Err(StreamIdError::NotGreater)` - An id not above the stream's tail
    pub fn append(
        &mut self,
        id: EntryIdSpec,
        fields: Vec<(Vec<u8>, Vec<u8>)>,
        now_ms: u64,
    ) -> Result<StreamId, StreamIdError> {
        let resolved = match id {
            EntryIdSpec::Explicit(id) => {
                if id == StreamId::MIN {
                    return Err(StreamIdError::Zero);
                }
                if !self.is_empty() && id <= self.last_id {
                    return Err(StreamIdError::NotGreater);
                }
                id
            }
            EntryIdSpec::PartialAuto(ms) => {
                if self.is_empty() {
                    // 0-0 is forbidden, so an empty stream starts 0-* at 0-1.
                    StreamId::new(ms, if ms == 0 { 1 } else { 0 })
                } else if ms > self.last_id.ms {
                    StreamId::new(ms, 0)
                } else if ms == self.last_id.ms {
                    StreamId::new(ms, self.last_id.seq + 1)
                } else {
                    return Err(StreamIdError::NotGreater);
                }
            }
            EntryIdSpec::Auto => {
                if self.is_empty() || now_ms > self.last_id.ms {
                    StreamId::new(now_ms, 0)
                } else {
                    StreamId::new(self.last_id.ms, self.last_id.seq + 1)
                }
            }
        };

        self.entries.push(StreamEntry {
            id: resolved,
            fields,
        });
        self.last_id = resolved;

        Ok(resolved)
    }

    /// Returns the entries with `start <= id <= end`, in insertion order.
    pub fn range(&self, start: StreamId, end: StreamId) -> &[StreamEntry] {
        let from = self.entries.partition_point(|entry| entry.id < start);
        let to = self.entries.partition_point(|entry| entry.id <= end);
        &self.entries[from..to]
    }

    /// Returns the entries with id strictly greater than `id`.
    pub fn entries_after(&self, id: StreamId) -> &[StreamEntry] {
        let from = self.entries.partition_point(|entry| entry.id <= id);
        &self.entries[from..]
    }
}

/// Renders a slice of entries as the RESP array used by XRANGE and XREAD:
/// each entry becomes `[id, [field, value, ...]]`.
pub fn entries_to_resp(entries: &[StreamEntry]) -> RespValue {
    let rendered = entries
        .iter()
        .map(|entry| {
            let mut pairs = Vec::with_capacity(entry.fields.len() * 2);
            for (name, value) in &entry.fields {
                pairs.push(RespValue::BulkString(name.clone()));
                pairs.push(RespValue::BulkString(value.clone()));
            }

            RespValue::Array(vec![
                RespValue::BulkString(entry.id.to_string().into_bytes()),
                RespValue::Array(pairs),
            ])
        })
        .collect();

    RespValue::Array(rendered)
}
