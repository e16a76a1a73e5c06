//! Shared argument parsing helpers for command handlers.

use crate::commands::CommandError;

/// Parses a non-negative integer argument.
pub fn parse_u64(arg: &[u8]) -> Result<u64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|text| text.parse::<u64>().ok())
        .ok_or(CommandError::NotAnInteger)
}

/// Parses a signed integer argument (list indices).
pub fn parse_i64(arg: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or(CommandError::NotAnInteger)
}

/// Parses a blocking timeout in seconds. Fractional values are allowed; the
/// value must be finite and non-negative.
pub fn parse_timeout_secs(arg: &[u8]) -> Result<f64, CommandError> {
    let timeout = std::str::from_utf8(arg)
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .ok_or(CommandError::TimeoutNotANumber)?;

    if timeout < 0.0 {
        return Err(CommandError::TimeoutNegative);
    }

    Ok(timeout)
}
