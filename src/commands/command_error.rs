use thiserror::Error;

use crate::resp::RespValue;
use crate::stream::StreamIdError;

/// Errors a command handler can produce. Each maps to one RESP simple error;
/// the connection stays open.
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),
    #[error("operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("value is out of range, must be positive")]
    NegativeCount,
    #[error("invalid expire time in 'set' command")]
    InvalidExpireTime,
    #[error("timeout is not a number")]
    TimeoutNotANumber,
    #[error("timeout is negative")]
    TimeoutNegative,
    #[error("syntax error")]
    Syntax,
    #[error("{0}")]
    StreamId(#[from] StreamIdError),
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
}

impl CommandError {
    /// Renders the error as the RESP reply sent to the client. Type errors
    /// carry the `WRONGTYPE` prefix; everything else is `ERR`.
    pub fn as_resp(&self) -> RespValue {
        match self {
            CommandError::WrongType => RespValue::Error(
                "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
            ),
            other => RespValue::Error(format!("ERR {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_resp_renderings() {
        let test_cases = vec![
            (
                CommandError::WrongArity("blpop"),
                "-ERR wrong number of arguments for 'blpop' command\r\n",
            ),
            (
                CommandError::WrongType,
                "-WRONGTYPE Operation against a key holding the wrong kind of value\r\n",
            ),
            (
                CommandError::TimeoutNotANumber,
                "-ERR timeout is not a number\r\n",
            ),
            (CommandError::TimeoutNegative, "-ERR timeout is negative\r\n"),
            (
                CommandError::StreamId(StreamIdError::Zero),
                "-ERR ID must be greater than 0-0\r\n",
            ),
            (
                CommandError::StreamId(StreamIdError::NotGreater),
                "-ERR ID equal or smaller than target stream top item\r\n",
            ),
            (
                CommandError::UnknownCommand("FLY".to_string()),
                "-ERR unknown command 'FLY'\r\n",
            ),
        ];

        for (error, expected) in test_cases {
            assert_eq!(
                error.as_resp().encode(),
                expected.as_bytes(),
                "rendering {:?}",
                error
            );
        }
    }
}
