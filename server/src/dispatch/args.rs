//! Argument parsing helpers shared by the command handlers: arity/format
//! validation happens here so the handlers themselves read as straight-line
//! engine calls, mirroring the reference `CommandDispatcher`'s per-command
//! argument checks.

use crate::protocol::Frame;

pub fn arity_err(cmd: &str) -> Frame {
    Frame::error(format!("ERR wrong number of arguments for '{}' command", cmd.to_lowercase()))
}

pub fn err(msg: impl Into<String>) -> Frame {
    Frame::error(format!("ERR {}", msg.into()))
}

pub fn utf8(b: &[u8]) -> Option<&str> {
    std::str::from_utf8(b).ok()
}

pub fn parse_i64(b: &[u8]) -> Option<i64> {
    utf8(b)?.parse().ok()
}

pub fn parse_usize(b: &[u8]) -> Option<usize> {
    utf8(b)?.parse().ok()
}

pub enum TimeoutError {
    NotAFloat,
    Negative,
}

impl TimeoutError {
    pub fn into_frame(self) -> Frame {
        match self {
            Self::NotAFloat => err("timeout is not a float or out of range"),
            Self::Negative => err("timeout is negative"),
        }
    }
}

/// BLPOP's timeout is a count of seconds, possibly fractional; rounds to
/// the nearest millisecond per the resolved open question in SPEC_FULL.md.
pub fn parse_timeout_ms_from_seconds(b: &[u8]) -> Result<u64, TimeoutError> {
    let secs: f64 = utf8(b).and_then(|s| s.parse().ok()).ok_or(TimeoutError::NotAFloat)?;
    if !secs.is_finite() {
        return Err(TimeoutError::NotAFloat);
    }
    if secs < 0.0 {
        return Err(TimeoutError::Negative);
    }
    Ok((secs * 1000.0).round() as u64)
}

/// XREAD's BLOCK option is already in milliseconds.
pub fn parse_timeout_ms(b: &[u8]) -> Option<u64> {
    utf8(b)?.parse().ok()
}
