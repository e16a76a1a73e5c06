//! Server configuration and the single-threaded event loop.
//!
//! One tick: poll the listener and every connection for readiness (bounded
//! by [`TICK_TIMEOUT_MS`]), accept at most one new connection, read and
//! dispatch complete frames, flush outbound queues, expire blocking
//! deadlines, then reap closed connections. All shared state (keyspace,
//! blocking registry, connection table) is mutated only inside the tick
//! body; there are no locks and no other threads.

use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener};
use std::os::fd::AsFd;
use std::time::Instant;

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::blocking::{BlockingRegistry, Wakeup};
use crate::commands::{CommandContext, dispatch};
use crate::connection::{Connection, ConnectionId};
use crate::keyspace::Keyspace;

/// Readiness timeout per tick, in milliseconds. This bounds the worst-case
/// latency between a blocking deadline expiring and its reply being
/// enqueued, and is therefore also the deadline resolution.
const TICK_TIMEOUT_MS: u16 = 100;

const CONNECTION_BACKLOG: i32 = 5;
const DEFAULT_PORT: u16 = 6379;

/// Errors that can occur during command-line argument parsing.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum CliError {
    #[error("Invalid port value")]
    InvalidPortValue,
    #[error("Unexpected extra argument")]
    UnexpectedArgument,
}

/// Configuration for a server instance.
#[derive(Debug, PartialEq)]
pub struct ServerConfig {
    /// The TCP port the server listens on.
    pub port: u16,
}

impl ServerConfig {
    /// Creates a configuration from command-line arguments.
    ///
    /// A single optional positional argument overrides the listen port.
    ///
    /// # Arguments
    ///
    /// * `command_line_args` - Iterator over the arguments, program name
    ///   first (typically `std::env::args()`)
    ///
    /// # Returns
    ///
    /// * `Ok(ServerConfig)` - Successfully parsed configuration
    /// * `Err(CliError)` - A malformed port or trailing arguments
    pub fn from_args<I: IntoIterator<Item = String>>(
        command_line_args: I,
    ) -> Result<Self, CliError> {
        let mut args = command_line_args.into_iter().skip(1);

        let port = match args.next() {
            Some(port) => validate_port(&port)?,
            None => DEFAULT_PORT,
        };

        if args.next().is_some() {
            return Err(CliError::UnexpectedArgument);
        }

        Ok(ServerConfig { port })
    }
}

/// Validates that a string names a TCP port in the range 1-65535.
fn validate_port(port: &str) -> Result<u16, CliError> {
    let port_number = port
        .parse::<u32>()
        .map_err(|_| CliError::InvalidPortValue)?;

    if !(1..=65535).contains(&port_number) {
        return Err(CliError::InvalidPortValue);
    }

    Ok(port_number as u16)
}

/// Per-connection readiness bits extracted from one poll call.
struct Readiness {
    listener_ready: bool,
    connections: Vec<(ConnectionId, bool, bool)>,
}

/// The server: listener, connection table, keyspace, and blocking registry,
/// all owned by the event loop.
pub struct Server {
    listener: TcpListener,
    connections: HashMap<ConnectionId, Connection>,
    next_connection_id: ConnectionId,
    keyspace: Keyspace,
    registry: BlockingRegistry,
}

impl Server {
    /// Binds the listening socket and prepares an empty server.
    ///
    /// The listener gets `SO_REUSEADDR`, a backlog of
    /// [`CONNECTION_BACKLOG`], and is set non-blocking before the event
    /// loop ever touches it.
    pub fn bind(config: &ServerConfig) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;

        let addr = SocketAddr::from(SocketAddrV4::new(Ipv4Addr::LOCALHOST, config.port));
        socket.bind(&addr.into())?;
        socket.listen(CONNECTION_BACKLOG)?;
        socket.set_nonblocking(true)?;

        let listener: TcpListener = socket.into();
        info!("listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            connections: HashMap::new(),
            next_connection_id: 1,
            keyspace: Keyspace::new(),
            registry: BlockingRegistry::new(),
        })
    }

    /// The address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the event loop until a fatal listener error.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            self.tick()?;
        }
    }

    /// One iteration of the event loop.
    fn tick(&mut self) -> io::Result<()> {
        let readiness = self.poll_readiness()?;

        if readiness.listener_ready {
            self.accept_one();
        }

        let mut doomed: Vec<ConnectionId> = Vec::new();

        for &(id, readable, _) in &readiness.connections {
            if readable {
                self.read_and_dispatch(id, &mut doomed);
            }
        }

        for &(id, _, writable) in &readiness.connections {
            if writable && !doomed.contains(&id) && !self.write_pending(id) {
                doomed.push(id);
            }
        }

        let expired = self.registry.expire(Instant::now());
        self.route_wakeups(expired, &mut doomed);

        for id in doomed {
            self.remove_connection(id);
        }

        Ok(())
    }

    /// Blocks in `poll` for at most [`TICK_TIMEOUT_MS`] and reports which
    /// sockets are ready. `EINTR` counts as an idle tick.
    fn poll_readiness(&mut self) -> io::Result<Readiness> {
        let mut poll_fds = Vec::with_capacity(self.connections.len() + 1);
        poll_fds.push(PollFd::new(self.listener.as_fd(), PollFlags::POLLIN));

        let mut order = Vec::with_capacity(self.connections.len());
        for (&id, connection) in &self.connections {
            let mut interest = PollFlags::POLLIN;
            if connection.has_pending_writes() {
                interest |= PollFlags::POLLOUT;
            }
            poll_fds.push(PollFd::new(connection.as_fd(), interest));
            order.push(id);
        }

        match poll(&mut poll_fds, PollTimeout::from(TICK_TIMEOUT_MS)) {
            Ok(_) => {}
            Err(nix::errno::Errno::EINTR) => {
                return Ok(Readiness {
                    listener_ready: false,
                    connections: Vec::new(),
                });
            }
            Err(errno) => return Err(io::Error::from(errno)),
        }

        let listener_ready = revents_intersect(&poll_fds[0], PollFlags::POLLIN);

        let connections = order
            .iter()
            .enumerate()
            .map(|(index, &id)| {
                let fd = &poll_fds[index + 1];
                let readable = revents_intersect(
                    fd,
                    PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR,
                );
                let writable = revents_intersect(fd, PollFlags::POLLOUT);
                (id, readable, writable)
            })
            .filter(|&(_, readable, writable)| readable || writable)
            .collect();

        Ok(Readiness {
            listener_ready,
            connections,
        })
    }

    /// Accepts at most one pending connection and registers it.
    fn accept_one(&mut self) {
        match self.listener.accept() {
            Ok((stream, peer_addr)) => {
                let id = self.next_connection_id;
                self.next_connection_id += 1;

                match Connection::new(id, stream) {
                    Ok(connection) => {
                        debug!("client connected: {} ({})", id, peer_addr);
                        self.connections.insert(id, connection);
                    }
                    Err(error) => {
                        warn!("failed to register connection from {}: {}", peer_addr, error);
                    }
                }
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {}
            Err(error) => warn!("accept failed: {}", error),
        }
    }

    /// Reads from a connection and dispatches every complete frame in its
    /// buffer. Frames from a parked connection are consumed and silently
    /// ignored; the protocol forbids pipelining past a blocking command.
    fn read_and_dispatch(&mut self, id: ConnectionId, doomed: &mut Vec<ConnectionId>) {
        let Some(connection) = self.connections.get_mut(&id) else {
            return;
        };

        match connection.fill_inbound() {
            Ok(true) => {}
            Ok(false) => {
                doomed.push(id);
                return;
            }
            Err(error) => {
                warn!("read error from {}: {}", connection.peer_addr(), error);
                doomed.push(id);
                return;
            }
        }

        loop {
            let frame = {
                let Some(connection) = self.connections.get_mut(&id) else {
                    return;
                };

                match connection.next_frame() {
                    Ok(Some(args)) => args,
                    Ok(None) => return,
                    Err(error) => {
                        // Malformed framing leaves the stream unrecoverable.
                        warn!("protocol error from {}: {}", connection.peer_addr(), error);
                        doomed.push(id);
                        return;
                    }
                }
            };

            if self.registry.is_parked(id) {
                debug!("ignoring frame from parked connection {}", id);
                continue;
            }

            let effect = {
                let mut ctx = CommandContext {
                    connection: id,
                    keyspace: &mut self.keyspace,
                    registry: &mut self.registry,
                    now: Instant::now(),
                };
                dispatch(&mut ctx, &frame)
            };

            self.route_wakeups(effect.wakeups, doomed);

            if let Some(reply) = effect.reply {
                if !self.enqueue_to(id, reply) {
                    doomed.push(id);
                    return;
                }
            }
        }
    }

    /// Flushes a connection's outbound queue. Returns `false` on fatal
    /// write errors.
    fn write_pending(&mut self, id: ConnectionId) -> bool {
        let Some(connection) = self.connections.get_mut(&id) else {
            return true;
        };

        match connection.flush_outbound() {
            Ok(()) => true,
            Err(error) => {
                warn!("write error to {}: {}", connection.peer_addr(), error);
                false
            }
        }
    }

    /// Enqueues wakeup payloads onto their target connections' outbound
    /// queues. A wakeup for a connection that has already gone away is
    /// dropped with it.
    fn route_wakeups(&mut self, wakeups: Vec<Wakeup>, doomed: &mut Vec<ConnectionId>) {
        for wakeup in wakeups {
            if !self.enqueue_to(wakeup.connection, wakeup.payload) {
                doomed.push(wakeup.connection);
            }
        }
    }

    fn enqueue_to(&mut self, id: ConnectionId, payload: Vec<u8>) -> bool {
        let Some(connection) = self.connections.get_mut(&id) else {
            return true;
        };

        if !connection.enqueue_reply(payload) {
            warn!("outbound queue overflow on connection {}", id);
            return false;
        }

        true
    }

    /// Closes a connection: drops its socket and queued replies and revokes
    /// it from the blocking registry so no future wakeup can target it.
    fn remove_connection(&mut self, id: ConnectionId) {
        if let Some(connection) = self.connections.remove(&id) {
            debug!("client disconnected: {} ({})", id, connection.peer_addr());
            self.registry.revoke(id);
        }
    }
}

fn revents_intersect(fd: &PollFd, flags: PollFlags) -> bool {
    fd.revents().is_some_and(|revents| revents.intersects(flags))
}
