use crate::commands::command_utils::parse_i64;
use crate::commands::{CommandContext, CommandEffect, CommandError};
use crate::keyspace::Value;
use crate::resp::RespValue;

/// Represents the parsed arguments for the LPOP command.
pub struct LpopArguments {
    key: Vec<u8>,
    count: Option<usize>,
}

impl LpopArguments {
    /// Parses `LPOP key [count]`. A negative count is rejected; zero is a
    /// valid count producing an empty array.
    pub fn parse(args: &[Vec<u8>]) -> Result<Self, CommandError> {
        match args {
            [key] => Ok(LpopArguments {
                key: key.clone(),
                count: None,
            }),
            [key, count] => {
                let count = parse_i64(count)?;
                if count < 0 {
                    return Err(CommandError::NegativeCount);
                }

                Ok(LpopArguments {
                    key: key.clone(),
                    count: Some(count as usize),
                })
            }
            _ => Err(CommandError::WrongArity("lpop")),
        }
    }
}

/// Handles the LPOP command.
///
/// Without a count the reply is a bulk string (nil when the key is absent);
/// with a count it is an array (empty when the key is absent). A pop that
/// empties the list deletes the key in the same step.
pub fn lpop(ctx: &mut CommandContext, args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    let arguments = LpopArguments::parse(args)?;

    match ctx.keyspace.find(&arguments.key, ctx.now) {
        None => Ok(CommandEffect::reply(match arguments.count {
            None => RespValue::NullBulkString,
            Some(_) => RespValue::Array(Vec::new()),
        })),
        Some(Value::List(list)) => {
            let available = list.len();

            match arguments.count {
                None => {
                    let element = ctx
                        .keyspace
                        .pop_list_front(&arguments.key)
                        .map(RespValue::BulkString)
                        .unwrap_or(RespValue::NullBulkString);
                    Ok(CommandEffect::reply(element))
                }
                Some(count) => {
                    // The count is client-supplied; reserve only what the
                    // list can actually yield.
                    let mut popped = Vec::with_capacity(count.min(available));
                    for _ in 0..count {
                        match ctx.keyspace.pop_list_front(&arguments.key) {
                            Some(element) => popped.push(RespValue::BulkString(element)),
                            None => break,
                        }
                    }
                    Ok(CommandEffect::reply(RespValue::Array(popped)))
                }
            }
        }
        Some(_) => Err(CommandError::WrongType),
    }
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

    fn keyspace_with_list(key: &[u8], elements: &[&str]) -> Keyspace {
        let mut keyspace = Keyspace::new();
        keyspace.insert(
            key.to_vec(),
            Value::List(elements.iter().map(|e| e.as_bytes().to_vec()).collect()),
        );
        keyspace
    }

    #[test]
    fn test_lpop_single() {
        let mut keyspace = keyspace_with_list(b"k", &["a", "b"]);
        let mut registry = BlockingRegistry::new();
        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        let effect = lpop(&mut ctx, &args(&["k"])).unwrap();
        assert_eq!(effect.reply, Some(b"$1\r\na\r\n".to_vec()));
    }

    #[test]
    fn test_lpop_single_missing_key() {
        let mut keyspace = Keyspace::new();
        let mut registry = BlockingRegistry::new();
        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        let effect = lpop(&mut ctx, &args(&["k"])).unwrap();
        assert_eq!(effect.reply, Some(b"$-1\r\n".to_vec()));
    }

    #[test]
    fn test_lpop_with_count() {
        let mut keyspace = keyspace_with_list(b"k", &["a", "b", "c"]);
        let mut registry = BlockingRegistry::new();
        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        let effect = lpop(&mut ctx, &args(&["k", "2"])).unwrap();
        assert_eq!(effect.reply, Some(b"*2\r\n$1\r\na\r\n$1\r\nb\r\n".to_vec()));
        assert!(keyspace.list_has_elements(b"k"));
    }

    #[test]
    fn test_lpop_huge_count_pops_whole_list() {
        let mut keyspace = keyspace_with_list(b"k", &["a", "b"]);
        let mut registry = BlockingRegistry::new();
        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        // A count far beyond the list length must not reserve memory for it.
        let effect = lpop(&mut ctx, &args(&["k", "9000000000"])).unwrap();
        assert_eq!(effect.reply, Some(b"*2\r\n$1\r\na\r\n$1\r\nb\r\n".to_vec()));
        assert!(!keyspace.contains(b"k"));
    }

    #[test]
    fn test_lpop_count_exceeding_length_deletes_key() {
        let mut keyspace = keyspace_with_list(b"k", &["a"]);
        let mut registry = BlockingRegistry::new();
        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        let effect = lpop(&mut ctx, &args(&["k", "5"])).unwrap();
        assert_eq!(effect.reply, Some(b"*1\r\n$1\r\na\r\n".to_vec()));
        assert!(!keyspace.contains(b"k"));
    }

    #[test]
    fn test_lpop_count_edge_cases() {
        let test_cases = vec![
            // (key exists, count arg, expected reply)
            (true, "0", b"*0\r\n".to_vec()),
            (false, "3", b"*0\r\n".to_vec()),
        ];

        for (key_exists, count, expected) in test_cases {
            let mut keyspace = if key_exists {
                keyspace_with_list(b"k", &["a"])
            } else {
                Keyspace::new()
            };
            let mut registry = BlockingRegistry::new();
            let mut ctx = CommandContext {
                connection: 1,
                keyspace: &mut keyspace,
                registry: &mut registry,
                now: Instant::now(),
            };

            let effect = lpop(&mut ctx, &args(&["k", count])).unwrap();
            assert_eq!(
                effect.reply,
                Some(expected),
                "key_exists={} count={}",
                key_exists,
                count
            );
        }
    }

    #[test]
    fn test_lpop_errors() {
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

        assert_eq!(lpop(&mut ctx, &args(&["s"])), Err(CommandError::WrongType));
        assert_eq!(
            lpop(&mut ctx, &args(&["k", "-1"])),
            Err(CommandError::NegativeCount)
        );
        assert_eq!(
            lpop(&mut ctx, &args(&["k", "x"])),
            Err(CommandError::NotAnInteger)
        );
        assert_eq!(lpop(&mut ctx, &[]), Err(CommandError::WrongArity("lpop")));
    }
}
