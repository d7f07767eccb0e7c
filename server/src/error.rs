//! Process-level errors: startup and I/O failures, as distinct from
//! `engine::EngineError` (which always turns into a wire `Error` frame and
//! never aborts the process). Mirrors the teacher's hand-rolled
//! `util::error::Error` shape rather than pulling in `anyhow`/`thiserror`.

use std::fmt;
use std::io::Error as IoError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(IoError),
    IoExtra(IoError, String),
    Other(String),
}

impl Error {
    pub fn io_extra(ioe: IoError, extra: impl ToString) -> Self {
        Self::IoExtra(ioe, extra.to_string())
    }

    pub fn other(msg: impl ToString) -> Self {
        Self::Other(msg.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::IoExtra(e, extra) => write!(f, "I/O error while {extra}: {e}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Self::Io(e)
    }
}
