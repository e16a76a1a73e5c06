use crate::commands::{CommandEffect, CommandError};
use crate::resp::RespValue;

/// Handles the ECHO command: replies with the argument as a bulk string.
pub fn echo(args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    let [message] = args else {
        return Err(CommandError::WrongArity("echo"));
    };

    Ok(CommandEffect::reply(RespValue::BulkString(message.clone())))
}
