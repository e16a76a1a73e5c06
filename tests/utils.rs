//! Shared helpers for the end-to-end tests: a server on an ephemeral port
//! running in a background thread, and clients speaking RESP over TCP.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use parkkv::server::{Server, ServerConfig};

/// Starts a server on an ephemeral port in a background thread and returns
/// its address. Each test gets its own server, so keys never collide across
/// tests; the thread lives until the test process exits.
pub fn start_server() -> SocketAddr {
    let (sender, receiver) = mpsc::channel();

    thread::spawn(move || {
        let mut server = Server::bind(&ServerConfig { port: 0 }).expect("bind test server");
        sender
            .send(server.local_addr().expect("test server address"))
            .expect("report test server address");
        let _ = server.run();
    });

    receiver.recv().expect("test server failed to start")
}

/// One TCP connection to the test server, with RESP command helpers and
/// deadline-bounded reads.
pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect to test server");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("set read timeout");

        Client { stream }
    }

    /// Sends one command as a RESP array of bulk strings.
    pub fn send(&mut self, parts: &[&str]) {
        let mut payload = format!("*{}\r\n", parts.len()).into_bytes();
        for part in parts {
            payload.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
            payload.extend_from_slice(part.as_bytes());
            payload.extend_from_slice(b"\r\n");
        }

        self.stream.write_all(&payload).expect("send command");
    }

    /// Sends raw bytes, for inline and malformed input tests.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).expect("send raw bytes");
    }

    /// Reads exactly `expected.len()` bytes and asserts they match.
    pub fn expect_reply(&mut self, expected: &str) {
        let mut reply = vec![0u8; expected.len()];
        self.stream.read_exact(&mut reply).expect("read reply");

        assert_eq!(
            String::from_utf8_lossy(&reply),
            expected,
            "unexpected reply bytes"
        );
    }

    /// Sends a command and asserts the exact reply.
    pub fn roundtrip(&mut self, command: &[&str], expected: &str) {
        self.send(command);
        self.expect_reply(expected);
    }

    /// True once the server has closed this connection.
    pub fn is_closed(&mut self) -> bool {
        let mut byte = [0u8; 1];
        matches!(self.stream.read(&mut byte), Ok(0))
    }
}

/// Sleeps long enough for the server to run several ticks, so ordering
/// between clients (who parked first, when a disconnect was observed) is
/// settled before the test proceeds.
pub fn settle() {
    thread::sleep(Duration::from_millis(300));
}
