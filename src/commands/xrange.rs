use crate::commands::{CommandContext, CommandEffect, CommandError};
use crate::keyspace::Value;
use crate::resp::RespValue;
use crate::stream::{StreamId, entries_to_resp, parse_range_end, parse_range_start};

/// Represents the parsed arguments for the XRANGE command.
pub struct XrangeArguments {
    key: Vec<u8>,
    start: StreamId,
    end: StreamId,
}

impl XrangeArguments {
    /// Parses `XRANGE key start end`, with the `-`/`+` shorthands and bare
    /// millisecond bounds (`(ms, 0)` on the low side, `(ms, max)` on the
    /// high side).
    pub fn parse(args: &[Vec<u8>]) -> Result<Self, CommandError> {
        let [key, start, end] = args else {
            return Err(CommandError::WrongArity("xrange"));
        };

        Ok(XrangeArguments {
            key: key.clone(),
            start: parse_range_start(start)?,
            end: parse_range_end(end)?,
        })
    }
}

/// Handles the XRANGE command: entries with `start <= id <= end` in
/// insertion order. An empty window is a valid empty array.
pub fn xrange(ctx: &mut CommandContext, args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    let arguments = XrangeArguments::parse(args)?;

    match ctx.keyspace.find(&arguments.key, ctx.now) {
        None => Ok(CommandEffect::reply(RespValue::Array(Vec::new()))),
        Some(Value::Stream(stream)) => Ok(CommandEffect::reply(entries_to_resp(
            stream.range(arguments.start, arguments.end),
        ))),
        Some(_) => Err(CommandError::WrongType),
    }
}
