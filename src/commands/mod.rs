//! Command dispatch: verbs are uppercased and routed to one handler module
//! per command, in the shape `…Arguments::parse` followed by the handler.
//!
//! Handlers run inside a single event-loop tick. They either produce an
//! immediate reply, or (for blocking verbs with nothing to deliver) park
//! the connection in the blocking registry and produce no reply at all.
//! Handlers that add list or stream data also return the wakeups the
//! registry produced for other connections.

mod blpop;
mod command_error;
mod command_utils;
mod echo;
mod get;
mod llen;
mod lpop;
mod lrange;
mod ping;
mod rpush_and_lpush;
mod set;
mod type_command;
mod xadd;
mod xrange;
mod xread;

pub use command_error::CommandError;

use std::time::Instant;

use crate::blocking::{BlockingRegistry, Wakeup};
use crate::connection::ConnectionId;
use crate::keyspace::Keyspace;
use crate::resp::RespValue;

/// Everything a handler may touch: the issuing connection's id, the shared
/// keyspace and blocking registry, and the tick's monotonic timestamp.
pub struct CommandContext<'a> {
    pub connection: ConnectionId,
    pub keyspace: &'a mut Keyspace,
    pub registry: &'a mut BlockingRegistry,
    pub now: Instant,
}

/// The observable outcome of one dispatched command.
///
/// `reply` is the encoded response for the issuing connection (`None` when
/// the command parked it); `wakeups` are replies for other, previously
/// parked connections that this command's side effects produced.
#[derive(Debug, PartialEq)]
pub struct CommandEffect {
    pub reply: Option<Vec<u8>>,
    pub wakeups: Vec<Wakeup>,
}

impl CommandEffect {
    fn reply(value: RespValue) -> Self {
        CommandEffect {
            reply: Some(value.encode()),
            wakeups: Vec::new(),
        }
    }

    fn reply_with_wakeups(value: RespValue, wakeups: Vec<Wakeup>) -> Self {
        CommandEffect {
            reply: Some(value.encode()),
            wakeups,
        }
    }

    fn parked() -> Self {
        CommandEffect {
            reply: None,
            wakeups: Vec::new(),
        }
    }
}

/// Routes one framed command to its handler. Handler errors become RESP
/// error replies; the connection stays open.
pub fn dispatch(ctx: &mut CommandContext, args: &[Vec<u8>]) -> CommandEffect {
    let Some(verb_bytes) = args.first() else {
        // An empty frame (blank inline line) is ignored.
        return CommandEffect {
            reply: None,
            wakeups: Vec::new(),
        };
    };

    let verb = String::from_utf8_lossy(verb_bytes).to_ascii_uppercase();
    let args = &args[1..];

    let result = match verb.as_str() {
        "PING" => ping::ping(args),
        "ECHO" => echo::echo(args),
        "SET" => set::set(ctx, args),
        "GET" => get::get(ctx, args),
        "TYPE" => type_command::type_command(ctx, args),
        "RPUSH" => rpush_and_lpush::rpush(ctx, args),
        "LPUSH" => rpush_and_lpush::lpush(ctx, args),
        "LPOP" => lpop::lpop(ctx, args),
        "LRANGE" => lrange::lrange(ctx, args),
        "LLEN" => llen::llen(ctx, args),
        "BLPOP" => blpop::blpop(ctx, args),
        "XADD" => xadd::xadd(ctx, args),
        "XRANGE" => xrange::xrange(ctx, args),
        "XREAD" => xread::xread(ctx, args),
        _ => Err(CommandError::UnknownCommand(verb)),
    };

    match result {
        Ok(effect) => effect,
        Err(error) => CommandEffect::reply(error.as_resp()),
    }
}
