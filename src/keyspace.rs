//! The shared keyspace: a map from binary-safe keys to tagged values.
//!
//! The keyspace is owned by the event loop and mutated only inside a dispatch
//! step, so it carries no synchronisation. String expiry is lazy: an expired
//! string is deleted by the access that observes it.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crate::stream::{Stream, StreamEntry, StreamId};

/// A key is raw bytes, never interpreted as text.
pub type Key = Vec<u8>;

/// A stored value: string with optional expiry, list, or stream.
#[derive(Debug)]
pub enum Value {
    String {
        data: Vec<u8>,
        expires_at: Option<Instant>,
    },
    List(VecDeque<Vec<u8>>),
    Stream(Stream),
}

/// The observable type of a key, as reported by TYPE.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ValueKind {
    None,
    String,
    List,
    Stream,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::None => "none",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Stream => "stream",
        }
    }
}

/// The key → value map shared by every command handler.
#[derive(Debug, Default)]
pub struct Keyspace {
    entries: HashMap<Key, Value>,
}

impl Keyspace {
    pub fn new() -> Self {
        Keyspace::default()
    }

    /// Looks a key up, deleting it first if it is an expired string.
    pub fn find(&mut self, key: &[u8], now: Instant) -> Option<&Value> {
        self.purge_if_expired(key, now);
        self.entries.get(key)
    }

    /// Mutable variant of [`find`](Keyspace::find).
    pub fn find_mut(&mut self, key: &[u8], now: Instant) -> Option<&mut Value> {
        self.purge_if_expired(key, now);
        self.entries.get_mut(key)
    }

    pub fn insert(&mut self, key: Key, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reports the type of a key for TYPE, observing lazy expiry.
    pub fn type_of(&mut self, key: &[u8], now: Instant) -> ValueKind {
        match self.find(key, now) {
            None => ValueKind::None,
            Some(Value::String { .. }) => ValueKind::String,
            Some(Value::List(_)) => ValueKind::List,
            Some(Value::Stream(_)) => ValueKind::Stream,
        }
    }

    /// True when `key` holds a list with at least one element.
    pub fn list_has_elements(&self, key: &[u8]) -> bool {
        matches!(self.entries.get(key), Some(Value::List(list)) if !list.is_empty())
    }

    /// Removes and returns the front element of the list at `key`.
    ///
    /// Deletes the key in the same step when the pop empties the list, so an
    /// empty list is never observable. Returns `None` when the key is absent
    /// or does not hold a list.
    pub fn pop_list_front(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        let Value::List(list) = self.entries.get_mut(key)? else {
            return None;
        };

        let element = list.pop_front()?;
        if list.is_empty() {
            self.entries.remove(key);
        }

        Some(element)
    }

    /// The entries of the stream at `key` with id strictly greater than
    /// `from`, or `None` when the key is absent or not a stream.
    pub fn stream_entries_after(&self, key: &[u8], from: StreamId) -> Option<&[StreamEntry]> {
        match self.entries.get(key) {
            Some(Value::Stream(stream)) => Some(stream.entries_after(from)),
            _ => None,
        }
    }

    fn purge_if_expired(&mut self, key: &[u8], now: Instant) {
        if let Some(Value::String {
            expires_at: Some(deadline),
            ..
        }) = self.entries.get(key)
        {
            if now >= *deadline {
                self.entries.remove(key);
            }
        }
    }
}
