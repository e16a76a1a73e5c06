use crate::commands::{CommandContext, CommandEffect, CommandError};
use crate::keyspace::Value;
use crate::resp::RespValue;

/// Handles the GET command.
///
/// An expired string is deleted by this access (inside `Keyspace::find`)
/// before the nil reply is produced.
pub fn get(ctx: &mut CommandContext, args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("get"));
    };

    match ctx.keyspace.find(key, ctx.now) {
        None => Ok(CommandEffect::reply(RespValue::NullBulkString)),
        Some(Value::String { data, .. }) => {
            Ok(CommandEffect::reply(RespValue::BulkString(data.clone())))
        }
        Some(_) => Err(CommandError::WrongType),
    }
}
