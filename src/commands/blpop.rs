use std::time::Duration;

use crate::commands::command_utils::parse_timeout_secs;
use crate::commands::{CommandContext, CommandEffect, CommandError};
use crate::keyspace::Value;
use crate::resp::RespValue;

/// Represents the parsed arguments for the BLPOP command: one or more keys
/// and a timeout in seconds (fractional allowed, 0 meaning wait forever).
pub struct BlpopArguments {
    keys: Vec<Vec<u8>>,
    timeout_secs: f64,
}

impl BlpopArguments {
    /// Parses `BLPOP key [key ...] timeout`.
    ///
    /// # Returns
    ///
    /// * `Ok(BlpopArguments)` - Successfully parsed arguments
    /// * `Err(CommandError::WrongArity)` - Fewer than two arguments
    /// * `Err(CommandError::TimeoutNotANumber)` - Timeout fails to parse
    /// * `Err(CommandError::TimeoutNegative)` - Timeout is below zero
    pub fn parse(args: &[Vec<u8>]) -> Result<Self, CommandError> {
        let [keys @ .., timeout] = args else {
            return Err(CommandError::WrongArity("blpop"));
        };

        if keys.is_empty() {
            return Err(CommandError::WrongArity("blpop"));
        }

        Ok(BlpopArguments {
            keys: keys.to_vec(),
            timeout_secs: parse_timeout_secs(timeout)?,
        })
    }
}

/// Handles the BLPOP command.
///
/// Keys are scanned left to right; the first one holding a non-empty list is
/// popped immediately and the command replies `[key, element]` without
/// parking. Otherwise the connection parks on every listed key and replies
/// at most once later: either through a list wakeup or with a nil array when
/// the deadline expires.
pub fn blpop(ctx: &mut CommandContext, args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    let arguments = BlpopArguments::parse(args)?;

    for key in &arguments.keys {
        match ctx.keyspace.find(key, ctx.now) {
            Some(Value::List(_)) => {
                if let Some(element) = ctx.keyspace.pop_list_front(key) {
                    return Ok(CommandEffect::reply(RespValue::key_element_array(
                        key, &element,
                    )));
                }
            }
            Some(_) => return Err(CommandError::WrongType),
            None => {}
        }
    }

    // A timeout too large to represent as a deadline parks indefinitely.
    let deadline = if arguments.timeout_secs == 0.0 {
        None
    } else {
        Duration::try_from_secs_f64(arguments.timeout_secs)
            .ok()
            .and_then(|timeout| ctx.now.checked_add(timeout))
    };

    ctx.registry
        .park_for_list_pop(ctx.connection, arguments.keys, deadline);

    Ok(CommandEffect::parked())
}
