use std::time::Duration;

use crate::commands::command_utils::parse_u64;
use crate::commands::{CommandContext, CommandEffect, CommandError};
use crate::keyspace::Value;
use crate::resp::RespValue;
use crate::stream::{FromIdSpec, StreamId, entries_to_resp, parse_from_id};

/// Represents the parsed arguments for the XREAD command.
pub struct XreadArguments {
    block_ms: Option<u64>,
    pairs: Vec<(Vec<u8>, FromIdSpec)>,
}

impl XreadArguments {
    /// Parses `XREAD [BLOCK ms] STREAMS key [key ...] id [id ...]`.
    ///
    /// The keys and ids after `STREAMS` must split evenly in two halves,
    /// pairing each key with its exclusive from-id.
    pub fn parse(args: &[Vec<u8>]) -> Result<Self, CommandError> {
        let (block_ms, rest) = match args {
            [first, block_ms, streams, rest @ ..]
                if first.eq_ignore_ascii_case(b"BLOCK")
                    && streams.eq_ignore_ascii_case(b"STREAMS") =>
            {
                (Some(parse_u64(block_ms)?), rest)
            }
            [first, rest @ ..] if first.eq_ignore_ascii_case(b"STREAMS") => (None, rest),
            [] => return Err(CommandError::WrongArity("xread")),
            _ => return Err(CommandError::Syntax),
        };

        if rest.is_empty() || rest.len() % 2 != 0 {
            return Err(CommandError::WrongArity("xread"));
        }

        let half = rest.len() / 2;
        let mut pairs = Vec::with_capacity(half);

        for i in 0..half {
            pairs.push((rest[i].clone(), parse_from_id(&rest[half + i])?));
        }

        Ok(XreadArguments { block_ms, pairs })
    }
}

/// Handles the XREAD command.
///
/// Replies with, per stream, the entries strictly after the stream's from-id.
/// Matchless streams are omitted; when nothing matches at all the reply is
/// nil unless `BLOCK` was given, in which case the connection parks on every
/// listed stream. The `$` from-id resolves to the stream's current last id
/// here, at park time, and is not re-read on wake.
pub fn xread(ctx: &mut CommandContext, args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    let arguments = XreadArguments::parse(args)?;

    let mut resolved: Vec<(Vec<u8>, StreamId)> = Vec::with_capacity(arguments.pairs.len());
    for (key, spec) in arguments.pairs {
        let from = match spec {
            FromIdSpec::At(id) => id,
            FromIdSpec::Latest => match ctx.keyspace.find(&key, ctx.now) {
                Some(Value::Stream(stream)) => stream.last_id(),
                Some(_) => return Err(CommandError::WrongType),
                None => StreamId::MIN,
            },
        };
        resolved.push((key, from));
    }

    let mut matches = Vec::new();
    for (key, from) in &resolved {
        match ctx.keyspace.find(key, ctx.now) {
            Some(Value::Stream(stream)) => {
                let entries = stream.entries_after(*from);
                if !entries.is_empty() {
                    matches.push(RespValue::Array(vec![
                        RespValue::BulkString(key.clone()),
                        entries_to_resp(entries),
                    ]));
                }
            }
            Some(_) => return Err(CommandError::WrongType),
            None => {}
        }
    }

    if !matches.is_empty() {
        return Ok(CommandEffect::reply(RespValue::Array(matches)));
    }

    let Some(block_ms) = arguments.block_ms else {
        return Ok(CommandEffect::reply(RespValue::NullArray));
    };

    // A BLOCK value too large to represent as a deadline parks indefinitely.
    let deadline = if block_ms == 0 {
        None
    } else {
        ctx.now.checked_add(Duration::from_millis(block_ms))
    };

    ctx.registry
        .park_for_stream_read(ctx.connection, resolved, deadline);

    Ok(CommandEffect::parked())
}
