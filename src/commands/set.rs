use std::time::Duration;

use crate::commands::command_utils::parse_u64;
use crate::commands::{CommandContext, CommandEffect, CommandError};
use crate::keyspace::Value;
use crate::resp::RespValue;

/// Represents the parsed arguments for the SET command.
pub struct SetArguments {
    key: Vec<u8>,
    value: Vec<u8>,
    expires_in: Option<Duration>,
}

impl SetArguments {
    /// Parses `SET key value [PX milliseconds]`.
    ///
    /// # Returns
    ///
    /// * `Ok(SetArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongArity)` - Not 2 or 4 arguments
    /// * `Err(CommandError::Syntax)` - The option is not `PX`
    /// * `Err(CommandError::InvalidExpireTime)` - `PX` value is zero
    /// * `Err(CommandError::NotAnInteger)` - `PX` value is not an integer
    pub fn parse(args: &[Vec<u8>]) -> Result<Self, CommandError> {
        match args {
            [key, value] => Ok(SetArguments {
                key: key.clone(),
                value: value.clone(),
                expires_in: None,
            }),
            [key, value, option, milliseconds] => {
                if !option.eq_ignore_ascii_case(b"PX") {
                    return Err(CommandError::Syntax);
                }

                let milliseconds = parse_u64(milliseconds)?;
                if milliseconds == 0 {
                    return Err(CommandError::InvalidExpireTime);
                }

                Ok(SetArguments {
                    key: key.clone(),
                    value: value.clone(),
                    expires_in: Some(Duration::from_millis(milliseconds)),
                })
            }
            _ => Err(CommandError::WrongArity("set")),
        }
    }
}

/// Handles the SET command. The expiry deadline is computed on the monotonic
/// clock, so wall-clock jumps cannot shorten or lengthen it.
pub fn set(ctx: &mut CommandContext, args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    let arguments = SetArguments::parse(args)?;

    ctx.keyspace.insert(
        arguments.key,
        Value::String {
            data: arguments.value,
            expires_at: arguments.expires_in.map(|ttl| ctx.now + ttl),
        },
    );

    Ok(CommandEffect::reply(RespValue::SimpleString(
        "OK".to_string(),
    )))
}
