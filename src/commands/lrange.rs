use crate::commands::command_utils::parse_i64;
use crate::commands::{CommandContext, CommandEffect, CommandError};
use crate::keyspace::Value;
use crate::resp::RespValue;

/// Represents the parsed arguments for the LRANGE command.
pub struct LrangeArguments {
    key: Vec<u8>,
    start: i64,
    stop: i64,
}

impl LrangeArguments {
    pub fn parse(args: &[Vec<u8>]) -> Result<Self, CommandError> {
        let [key, start, stop] = args else {
            return Err(CommandError::WrongArity("lrange"));
        };

        Ok(LrangeArguments {
            key: key.clone(),
            start: parse_i64(start)?,
            stop: parse_i64(stop)?,
        })
    }
}

/// Handles the LRANGE command.
///
/// Negative indices count from the end of the list; both bounds are clamped
/// to the list, and an inverted or out-of-range window yields an empty array.
pub fn lrange(ctx: &mut CommandContext, args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    let arguments = LrangeArguments::parse(args)?;

    match ctx.keyspace.find(&arguments.key, ctx.now) {
        None => Ok(CommandEffect::reply(RespValue::Array(Vec::new()))),
        Some(Value::List(list)) => {
            let length = list.len() as i64;

            let start = resolve_index(arguments.start, length).max(0);
            let stop = resolve_index(arguments.stop, length).min(length - 1);

            if start > stop || start >= length {
                return Ok(CommandEffect::reply(RespValue::Array(Vec::new())));
            }

            let elements = list
                .iter()
                .skip(start as usize)
                .take((stop - start + 1) as usize)
                .map(|element| RespValue::BulkString(element.clone()))
                .collect();

            Ok(CommandEffect::reply(RespValue::Array(elements)))
        }
        Some(_) => Err(CommandError::WrongType),
    }
}

fn resolve_index(index: i64, length: i64) -> i64 {
    if index < 0 { length + index } else { index }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::blocking::BlockingRegistry;
    use crate::keyspace::Keyspace;

    fn args(parts: &[&str]) -> Vec<Vec<u8>> {
        parts.iter().map(|part| part.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_lrange_windows() {
        let mut keyspace = Keyspace::new();
        keyspace.insert(
            b"k".to_vec(),
            Value::List(
                ["a", "b", "c", "d", "e"]
                    .iter()
                    .map(|e| e.as_bytes().to_vec())
                    .collect(),
            ),
        );

        let mut registry = BlockingRegistry::new();
        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        let test_cases = vec![
            (
                ("0", "-1"),
                b"*5\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n$1\r\nd\r\n$1\r\ne\r\n".to_vec(),
            ),
            (("1", "3"), b"*3\r\n$1\r\nb\r\n$1\r\nc\r\n$1\r\nd\r\n".to_vec()),
            (("-2", "-1"), b"*2\r\n$1\r\nd\r\n$1\r\ne\r\n".to_vec()),
            // Out-of-range bounds clamp instead of failing.
            (("-100", "100"), b"*5\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n$1\r\nd\r\n$1\r\ne\r\n".to_vec()),
            (("3", "1"), b"*0\r\n".to_vec()),
            (("5", "10"), b"*0\r\n".to_vec()),
            (("-1", "-5"), b"*0\r\n".to_vec()),
        ];

        for ((start, stop), expected) in test_cases {
            let effect = lrange(&mut ctx, &args(&["k", start, stop])).unwrap();
            assert_eq!(
                effect.reply,
                Some(expected),
                "LRANGE k {} {}",
                start,
                stop
            );
        }
    }

    #[test]
    fn test_lrange_missing_key() {
        let mut keyspace = Keyspace::new();
        let mut registry = BlockingRegistry::new();
        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        let effect = lrange(&mut ctx, &args(&["k", "0", "-1"])).unwrap();
        assert_eq!(effect.reply, Some(b"*0\r\n".to_vec()));
    }

    #[test]
    fn test_lrange_errors() {
        let mut keyspace = Keyspace::new();
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

        assert_eq!(
            lrange(&mut ctx, &args(&["s", "0", "-1"])),
            Err(CommandError::WrongType)
        );
        assert_eq!(
            lrange(&mut ctx, &args(&["k", "0"])),
            Err(CommandError::WrongArity("lrange"))
        );
        assert_eq!(
            lrange(&mut ctx, &args(&["k", "x", "1"])),
            Err(CommandError::NotAnInteger)
        );
    }
}
