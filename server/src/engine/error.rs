//! The engine's error taxonomy (SPEC_FULL.md §4.3/§7): wrong-type,
//! invalid-argument, and overflow, each carrying the fixed prefix token the
//! client sees on the wire. Kept separate from `crate::error::Error`
//! (process-level I/O/startup failures) since this one always turns into a
//! `Frame::Error`, never a fatal condition.

use crate::protocol::Frame;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    WrongType,
    InvalidArgument(String),
    Overflow,
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn into_frame(self) -> Frame {
        Frame::Error(self.to_string())
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::WrongType => {
                write!(f, "WRONGTYPE Operation against a key holding the wrong kind of value")
            }
            EngineError::InvalidArgument(msg) => write!(f, "ERR {msg}"),
            EngineError::Overflow => write!(f, "ERR increment or decrement would overflow"),
        }
    }
}

impl From<EngineError> for Frame {
    fn from(e: EngineError) -> Self {
        e.into_frame()
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
