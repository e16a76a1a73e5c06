use crate::commands::{CommandContext, CommandEffect, CommandError};
use crate::resp::RespValue;

/// Handles the TYPE command: `+string`, `+list`, `+stream`, or `+none`.
pub fn type_command(
    ctx: &mut CommandContext,
    args: &[Vec<u8>],
) -> Result<CommandEffect, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("type"));
    };

    let kind = ctx.keyspace.type_of(key, ctx.now);
    Ok(CommandEffect::reply(RespValue::SimpleString(
        kind.as_str().to_string(),
    )))
}
