use std::time::{SystemTime, UNIX_EPOCH};

use crate::commands::{CommandContext, CommandEffect, CommandError};
use crate::keyspace::Value;
use crate::resp::RespValue;
use crate::stream::{EntryIdSpec, Stream, parse_entry_id};

/// Represents the parsed arguments for the XADD command.
pub struct XaddArguments {
    key: Vec<u8>,
    id: EntryIdSpec,
    fields: Vec<(Vec<u8>, Vec<u8>)>,
}

impl XaddArguments {
    /// Parses `XADD key id field value [field value ...]`.
    ///
    /// The id is one of an explicit `<ms>-<seq>`, a partial-auto `<ms>-*`,
    /// or a full-auto `*`. At least one field/value pair is required and
    /// pairs must come in twos.
    pub fn parse(args: &[Vec<u8>]) -> Result<Self, CommandError> {
        let [key, id, fields @ ..] = args else {
            return Err(CommandError::WrongArity("xadd"));
        };

        if fields.is_empty() || fields.len() % 2 != 0 {
            return Err(CommandError::WrongArity("xadd"));
        }

        Ok(XaddArguments {
            key: key.clone(),
            id: parse_entry_id(id)?,
            fields: fields
                .chunks(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect(),
        })
    }
}

/// Handles the XADD command.
///
/// Appends an entry to the stream at `key` (creating the stream on first
/// write), replies with the resolved id as a bulk string, and hands the new
/// entry to any parked stream readers. A rejected id on a fresh key leaves
/// no empty stream behind.
pub fn xadd(ctx: &mut CommandContext, args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    let arguments = XaddArguments::parse(args)?;
    let now_ms = wall_clock_ms();

    let resolved = match ctx.keyspace.find_mut(&arguments.key, ctx.now) {
        Some(Value::Stream(stream)) => stream.append(arguments.id, arguments.fields, now_ms)?,
        Some(_) => return Err(CommandError::WrongType),
        None => {
            let mut stream = Stream::new();
            let resolved = stream.append(arguments.id, arguments.fields, now_ms)?;
            ctx.keyspace
                .insert(arguments.key.clone(), Value::Stream(stream));
            resolved
        }
    };

    let wakeups = ctx.registry.wake_for_stream(&arguments.key, ctx.keyspace);

    Ok(CommandEffect::reply_with_wakeups(
        RespValue::BulkString(resolved.to_string().into_bytes()),
        wakeups,
    ))
}

/// Milliseconds since the Unix epoch for full-auto ids. A clock before the
/// epoch degenerates to 0, which the stream's regression bump absorbs.
fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::blocking::BlockingRegistry;
    use crate::keyspace::Keyspace;
    use crate::stream::StreamId;
    use crate::stream::StreamIdError;

    fn args(parts: &[&str]) -> Vec<Vec<u8>> {
        parts.iter().map(|part| part.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_xadd_explicit_and_partial_auto_sequence() {
        let mut keyspace = Keyspace::new();
        let mut registry = BlockingRegistry::new();
        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        let test_cases = vec![
            (args(&["s", "1-1", "a", "1"]), Ok(b"$3\r\n1-1\r\n".to_vec())),
            (
                args(&["s", "1-1", "a", "2"]),
                Err(CommandError::StreamId(StreamIdError::NotGreater)),
            ),
            (args(&["s", "1-*", "a", "3"]), Ok(b"$3\r\n1-2\r\n".to_vec())),
            (args(&["s", "2-*", "a", "4"]), Ok(b"$3\r\n2-0\r\n".to_vec())),
            (
                args(&["s", "0-0", "a", "5"]),
                Err(CommandError::StreamId(StreamIdError::Zero)),
            ),
        ];

        for (input, expected) in test_cases {
            let result = xadd(&mut ctx, &input).map(|effect| effect.reply.unwrap());
            assert_eq!(result, expected, "XADD {:?}", input);
        }
    }

    #[test]
    fn test_xadd_full_auto_generates_increasing_ids() {
        let mut keyspace = Keyspace::new();
        let mut registry = BlockingRegistry::new();
        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        xadd(&mut ctx, &args(&["s", "*", "a", "1"])).unwrap();
        xadd(&mut ctx, &args(&["s", "*", "a", "2"])).unwrap();

        match keyspace.find(b"s", Instant::now()) {
            Some(Value::Stream(stream)) => {
                assert_eq!(stream.len(), 2);
                assert!(stream.last_id() > StreamId::MIN);
            }
            other => panic!("expected stream, found {:?}", other),
        }
    }

    #[test]
    fn test_xadd_rejected_id_leaves_no_empty_stream() {
        let mut keyspace = Keyspace::new();
        let mut registry = BlockingRegistry::new();
        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        let result = xadd(&mut ctx, &args(&["fresh", "0-0", "a", "1"]));
        assert_eq!(result, Err(CommandError::StreamId(StreamIdError::Zero)));
        assert!(!keyspace.contains(b"fresh"));
    }

    #[test]
    fn test_xadd_wakes_parked_stream_reader() {
        let mut keyspace = Keyspace::new();
        let mut registry = BlockingRegistry::new();
        registry.park_for_stream_read(9, vec![(b"s".to_vec(), StreamId::MIN)], None);

        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        let effect = xadd(&mut ctx, &args(&["s", "5-1", "k", "v"])).unwrap();

        assert_eq!(effect.reply, Some(b"$3\r\n5-1\r\n".to_vec()));
        assert_eq!(effect.wakeups.len(), 1);
        assert_eq!(effect.wakeups[0].connection, 9);
        assert_eq!(
            effect.wakeups[0].payload,
            b"*1\r\n*2\r\n$1\r\ns\r\n*1\r\n*2\r\n$3\r\n5-1\r\n*2\r\n$1\r\nk\r\n$1\r\nv\r\n".to_vec()
        );
        assert!(!registry.is_parked(9));
    }

    #[test]
    fn test_xadd_errors() {
        let mut keyspace = Keyspace::new();
        keyspace.insert(b"l".to_vec(), Value::List([b"x".to_vec()].into()));

        let mut registry = BlockingRegistry::new();
        let mut ctx = CommandContext {
            connection: 1,
            keyspace: &mut keyspace,
            registry: &mut registry,
            now: Instant::now(),
        };

        let test_cases = vec![
            (args(&["s", "1-1"]), CommandError::WrongArity("xadd")),
            (args(&["s", "1-1", "a"]), CommandError::WrongArity("xadd")),
            (
                args(&["s", "1-1", "a", "1", "b"]),
                CommandError::WrongArity("xadd"),
            ),
            (
                args(&["s", "bogus", "a", "1"]),
                CommandError::StreamId(StreamIdError::Format),
            ),
            (args(&["l", "1-1", "a", "1"]), CommandError::WrongType),
        ];

        for (input, expected) in test_cases {
            assert_eq!(xadd(&mut ctx, &input).err(), Some(expected), "{:?}", input);
        }
    }
}
