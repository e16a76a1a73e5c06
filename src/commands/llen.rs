use crate::commands::{CommandContext, CommandEffect, CommandError};
use crate::keyspace::Value;
use crate::resp::RespValue;

/// Handles the LLEN command: list length, zero for a missing key.
pub fn llen(ctx: &mut CommandContext, args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    let [key] = args else {
        return Err(CommandError::WrongArity("llen"));
    };

    match ctx.keyspace.find(key, ctx.now) {
        None => Ok(CommandEffect::reply(RespValue::Integer(0))),
        Some(Value::List(list)) => Ok(CommandEffect::reply(RespValue::Integer(list.len() as i64))),
        Some(_) => Err(CommandError::WrongType),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::blocking::BlockingRegistry;
    use crate::keyspace::Keyspace;

    #[test]
    fn test_llen() {
        let mut keyspace = Keyspace::new();
        keyspace.insert(
            b"k".to_vec(),
            Value::List([b"a".to_vec(), b"b".to_vec()].into()),
        );
        keyspace.insert(
            b"s".to_vec(),
            Value::String {
                data: b"v".to_vec(),
                expires_at: None,
            },
        );

        let mut registry = BlockingRegistry::new();
        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        let effect = llen(&mut ctx, &[b"k".to_vec()]).unwrap();
        assert_eq!(effect.reply, Some(b":2\r\n".to_vec()));

        let effect = llen(&mut ctx, &[b"missing".to_vec()]).unwrap();
        assert_eq!(effect.reply, Some(b":0\r\n".to_vec()));

        assert_eq!(llen(&mut ctx, &[b"s".to_vec()]), Err(CommandError::WrongType));
        assert_eq!(llen(&mut ctx, &[]), Err(CommandError::WrongArity("llen")));
    }
}
