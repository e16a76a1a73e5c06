use std::collections::VecDeque;

use crate::commands::{CommandContext, CommandEffect, CommandError};
use crate::keyspace::Value;
use crate::resp::RespValue;

/// Handles the RPUSH command: appends values and reports the new length.
pub fn rpush(ctx: &mut CommandContext, args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    push(ctx, args, false, "rpush")
}

/// Handles the LPUSH command: prepends values and reports the new length.
/// Values are prepended one by one, so `LPUSH k a b c` leaves `[c, b, a]`.
pub fn lpush(ctx: &mut CommandContext, args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    push(ctx, args, true, "lpush")
}

/// Shared push path. The reply carries the list length as left by this
/// command; waiters parked on the key are then handed elements, which may
/// empty and delete the list again before the next command runs.
fn push(
    ctx: &mut CommandContext,
    args: &[Vec<u8>],
    front: bool,
    command: &'static str,
) -> Result<CommandEffect, CommandError> {
    let [key, values @ ..] = args else {
        return Err(CommandError::WrongArity(command));
    };

    if values.is_empty() {
        return Err(CommandError::WrongArity(command));
    }

    let new_length = match ctx.keyspace.find_mut(key, ctx.now) {
        Some(Value::List(list)) => {
            push_all(list, values, front);
            list.len()
        }
        Some(_) => return Err(CommandError::WrongType),
        None => {
            let mut list = VecDeque::with_capacity(values.len());
            push_all(&mut list, values, front);
            let length = list.len();
            ctx.keyspace.insert(key.clone(), Value::List(list));
            length
        }
    };

    let wakeups = ctx.registry.wake_for_list(key, ctx.keyspace);

    Ok(CommandEffect::reply_with_wakeups(
        RespValue::Integer(new_length as i64),
        wakeups,
    ))
}

fn push_all(list: &mut VecDeque<Vec<u8>>, values: &[Vec<u8>], front: bool) {
    for value in values {
        if front {
            list.push_front(value.clone());
        } else {
            list.push_back(value.clone());
        }
    }
}
