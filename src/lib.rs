//! An in-memory key/value server speaking RESP over TCP.
//!
//! The crate provides a single-threaded server supporting:
//!
//! - Basic key-value operations (GET, SET with PX expiry)
//! - List operations (LPUSH, RPUSH, LPOP, BLPOP, LRANGE, LLEN)
//! - Stream operations (XADD, XRANGE, XREAD with BLOCK)
//! - Server commands (PING, ECHO, TYPE)
//!
//! Everything runs on one cooperative event loop: a bounded poll tick
//! multiplexes reads, writes and timers over non-blocking sockets. Blocking
//! commands never suspend the loop; they park the issuing connection in the
//! blocking registry, which later wakes it with a deferred reply while
//! preserving strict per-connection reply order.

pub mod blocking;
pub mod commands;
pub mod connection;
pub mod keyspace;
pub mod resp;
pub mod server;
pub mod stream;
