//! The blocking registry: parks connections against keys and produces the
//! wakeups that resume them.
//!
//! The registry stores only connection ids and key bytes, never references
//! into the keyspace; wake paths re-look the key up on every call. Handoff is
//! strict FIFO per key, and a waiter is fully unparked (removed from every
//! FIFO it joined) before its wakeup is returned, so a later wake can never
//! select it again.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crate::connection::ConnectionId;
use crate::keyspace::{Key, Keyspace};
use crate::resp::RespValue;
use crate::stream::{StreamId, entries_to_resp};

/// A reply produced for a previously parked connection. The event loop routes
/// the payload onto that connection's outbound queue.
#[derive(Debug, PartialEq)]
pub struct Wakeup {
    pub connection: ConnectionId,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
enum ParkKind {
    ListPop,
    StreamRead { from_ids: HashMap<Key, StreamId> },
}

#[derive(Debug)]
struct ParkRecord {
    kind: ParkKind,
    keys: Vec<Key>,
    deadline: Option<Instant>,
}

/// Tracks which connections are parked, on which keys, and until when.
#[derive(Debug, Default)]
pub struct BlockingRegistry {
    list_waiters: HashMap<Key, VecDeque<ConnectionId>>,
    stream_waiters: HashMap<Key, VecDeque<ConnectionId>>,
    parked: HashMap<ConnectionId, ParkRecord>,
}

impl BlockingRegistry {
    pub fn new() -> Self {
        BlockingRegistry::default()
    }

    /// Parks a connection waiting to pop from any of `keys`.
    ///
    /// The connection joins each key's FIFO at the tail, so the
    /// longest-waiting parker wins when data arrives. `deadline` of `None`
    /// parks indefinitely.
    pub fn park_for_list_pop(
        &mut self,
        connection: ConnectionId,
        keys: Vec<Key>,
        deadline: Option<Instant>,
    ) {
        for key in &keys {
            self.list_waiters
                .entry(key.clone())
                .or_default()
                .push_back(connection);
        }

        self.parked.insert(
            connection,
            ParkRecord {
                kind: ParkKind::ListPop,
                keys,
                deadline,
            },
        );
    }

    /// Parks a connection waiting for stream entries past a per-key from-id.
    pub fn park_for_stream_read(
        &mut self,
        connection: ConnectionId,
        from_ids: Vec<(Key, StreamId)>,
        deadline: Option<Instant>,
    ) {
        let keys: Vec<Key> = from_ids.iter().map(|(key, _)| key.clone()).collect();

        for key in &keys {
            self.stream_waiters
                .entry(key.clone())
                .or_default()
                .push_back(connection);
        }

        self.parked.insert(
            connection,
            ParkRecord {
                kind: ParkKind::StreamRead {
                    from_ids: from_ids.into_iter().collect(),
                },
                keys,
                deadline,
            },
        );
    }

    /// Hands list elements at `key` to waiting connections, FIFO.
    ///
    /// Serves waiters while the list still has elements: each served waiter
    /// receives a `[key, element]` array built from one popped element (the
    /// key is deleted when the pop empties the list) and is fully unparked.
    /// Stale FIFO entries whose connection is no longer parked are discarded
    /// on encounter.
    pub fn wake_for_list(&mut self, key: &[u8], keyspace: &mut Keyspace) -> Vec<Wakeup> {
        let mut wakeups = Vec::new();

        loop {
            if !keyspace.list_has_elements(key) {
                break;
            }

            let Some(connection) = self
                .list_waiters
                .get_mut(key)
                .and_then(|queue| queue.pop_front())
            else {
                break;
            };

            if !self.parked.contains_key(&connection) {
                continue;
            }

            let Some(element) = keyspace.pop_list_front(key) else {
                break;
            };

            let payload = RespValue::key_element_array(key, &element).encode();
            self.unpark(connection);
            wakeups.push(Wakeup {
                connection,
                payload,
            });
        }

        self.drop_queue_if_empty(QueueKind::List, key);
        wakeups
    }

    /// Hands new stream entries at `key` to waiting connections, FIFO.
    ///
    /// Walks the key's FIFO from the head: each live waiter whose from-id has
    /// entries past it receives a one-stream XREAD reply and is fully
    /// unparked. The walk stops at the first waiter with no matches (or when
    /// the FIFO is exhausted); stale entries are discarded on encounter.
    pub fn wake_for_stream(&mut self, key: &[u8], keyspace: &Keyspace) -> Vec<Wakeup> {
        let mut wakeups = Vec::new();

        loop {
            let Some(&connection) = self
                .stream_waiters
                .get(key)
                .and_then(|queue| queue.front())
            else {
                break;
            };

            let Some(record) = self.parked.get(&connection) else {
                if let Some(queue) = self.stream_waiters.get_mut(key) {
                    queue.pop_front();
                }
                continue;
            };

            let ParkKind::StreamRead { from_ids } = &record.kind else {
                break;
            };

            let from = from_ids.get(key).copied().unwrap_or(StreamId::MIN);
            let entries = match keyspace.stream_entries_after(key, from) {
                Some(entries) if !entries.is_empty() => entries,
                _ => break,
            };

            let payload = RespValue::Array(vec![RespValue::Array(vec![
                RespValue::BulkString(key.to_vec()),
                entries_to_resp(entries),
            ])])
            .encode();

            if let Some(queue) = self.stream_waiters.get_mut(key) {
                queue.pop_front();
            }
            self.unpark(connection);
            wakeups.push(Wakeup {
                connection,
                payload,
            });
        }

        self.drop_queue_if_empty(QueueKind::Stream, key);
        wakeups
    }

    /// Expires every parked connection whose deadline has passed.
    ///
    /// The timeout reply is the nil array for both blocking pops and blocking
    /// stream reads. Linear in the parked set, which is bounded by the
    /// connection count.
    pub fn expire(&mut self, now: Instant) -> Vec<Wakeup> {
        let expired: Vec<ConnectionId> = self
            .parked
            .iter()
            .filter(|(_, record)| record.deadline.is_some_and(|deadline| deadline <= now))
            .map(|(&connection, _)| connection)
            .collect();

        let mut wakeups = Vec::with_capacity(expired.len());
        for connection in expired {
            self.unpark(connection);
            wakeups.push(Wakeup {
                connection,
                payload: RespValue::NullArray.encode(),
            });
        }

        wakeups
    }

    /// Removes a connection from the registry on disconnect. No reply is
    /// produced; any queued replies die with the connection.
    pub fn revoke(&mut self, connection: ConnectionId) {
        self.unpark(connection);
    }

    pub fn is_parked(&self, connection: ConnectionId) -> bool {
        self.parked.contains_key(&connection)
    }

    /// Number of currently parked connections.
    pub fn parked_count(&self) -> usize {
        self.parked.len()
    }

    /// Number of keys with at least one waiter FIFO.
    pub fn waiting_key_count(&self) -> usize {
        self.list_waiters.len() + self.stream_waiters.len()
    }

    /// Removes the connection's park record and scrubs it from every FIFO it
    /// joined, so no later wake or expire can select it.
    fn unpark(&mut self, connection: ConnectionId) {
        let Some(record) = self.parked.remove(&connection) else {
            return;
        };

        let waiters = match record.kind {
            ParkKind::ListPop => &mut self.list_waiters,
            ParkKind::StreamRead { .. } => &mut self.stream_waiters,
        };

        for key in &record.keys {
            let mut now_empty = false;
            if let Some(queue) = waiters.get_mut(key) {
                queue.retain(|&waiter| waiter != connection);
                now_empty = queue.is_empty();
            }
            if now_empty {
                waiters.remove(key);
            }
        }
    }

    fn drop_queue_if_empty(&mut self, kind: QueueKind, key: &[u8]) {
        let waiters = match kind {
            QueueKind::List => &mut self.list_waiters,
            QueueKind::Stream => &mut self.stream_waiters,
        };

        if waiters.get(key).is_some_and(VecDeque::is_empty) {
            waiters.remove(key);
        }
    }
}

enum QueueKind {
    List,
    Stream,
}
