use crate::commands::{CommandEffect, CommandError};
use crate::resp::RespValue;

/// Handles the PING command.
pub fn ping(args: &[Vec<u8>]) -> Result<CommandEffect, CommandError> {
    if !args.is_empty() {
        return Err(CommandError::WrongArity("ping"));
    }

    Ok(CommandEffect::reply(RespValue::SimpleString(
        "PONG".to_string(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping() {
        let effect = ping(&[]).unwrap();
        assert_eq!(effect.reply, Some(b"+PONG\r\n".to_vec()));
        assert!(effect.wakeups.is_empty());
    }

    #[test]
    fn test_ping_rejects_arguments() {
        assert_eq!(
            ping(&[b"extra".to_vec()]),
            Err(CommandError::WrongArity("ping"))
        );
    }
}
