//! Per-connection state: the inbound parse buffer and the outbound reply
//! queue.
//!
//! Sockets are non-blocking; reads and writes stop at `WouldBlock` and resume
//! on the next tick. Replies leave the queue head-first and partial writes
//! keep the remainder at the head, so a short write can never reorder
//! replies.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsFd, BorrowedFd};

use bytes::{Buf, BytesMut};

use crate::resp::{Frame, FrameError, parse_frame};

/// Identifies one client connection. Ids are assigned from a counter and
/// never reused while the process lives.
pub type ConnectionId = u64;

const READ_CHUNK: usize = 4096;

/// Back-pressure cap: a connection whose outbound queue exceeds this many
/// bytes is closed rather than buffered without bound.
pub const MAX_OUTBOUND_BYTES: usize = 4 * 1024 * 1024;

pub struct Connection {
    id: ConnectionId,
    stream: TcpStream,
    peer_addr: SocketAddr,
    inbound: BytesMut,
    outbound: VecDeque<Vec<u8>>,
    front_written: usize,
    queued_bytes: usize,
}

impl Connection {
    pub fn new(id: ConnectionId, stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        let peer_addr = stream.peer_addr()?;

        Ok(Connection {
            id,
            stream,
            peer_addr,
            inbound: BytesMut::with_capacity(READ_CHUNK),
            outbound: VecDeque::new(),
            front_written: 0,
            queued_bytes: 0,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }

    /// Reads whatever the socket has into the inbound buffer.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The connection is still open (possibly after new bytes)
    /// * `Ok(false)` - The peer closed its end
    /// * `Err(_)` - A fatal I/O error; the caller removes the connection
    pub fn fill_inbound(&mut self) -> io::Result<bool> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => self.inbound.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(true),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Pops the next complete frame off the inbound buffer, if one is there.
    pub fn next_frame(&mut self) -> Result<Option<Vec<Vec<u8>>>, FrameError> {
        match parse_frame(&self.inbound)? {
            Some(Frame { consumed, args }) => {
                self.inbound.advance(consumed);
                Ok(Some(args))
            }
            None => Ok(None),
        }
    }

    /// Appends a reply to the outbound queue.
    ///
    /// Returns `false` when the queue has grown past [`MAX_OUTBOUND_BYTES`];
    /// the caller closes the connection in that case.
    pub fn enqueue_reply(&mut self, payload: Vec<u8>) -> bool {
        self.queued_bytes += payload.len();
        self.outbound.push_back(payload);
        self.queued_bytes <= MAX_OUTBOUND_BYTES
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Writes queued replies until the queue drains or the socket pushes
    /// back. A partial write leaves the unwritten tail at the queue head.
    pub fn flush_outbound(&mut self) -> io::Result<()> {
        while let Some(front) = self.outbound.front() {
            let front_len = front.len();

            match self.stream.write(&front[self.front_written..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(written) => {
                    self.front_written += written;
                    if self.front_written == front_len {
                        self.outbound.pop_front();
                        self.queued_bytes -= front_len;
                        self.front_written = 0;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}
