//! The wire value: a tagged union mirroring the RESP-style grammar this
//! server speaks. `Frame` is what the parser produces and the serializer
//! consumes; it never touches the key/value store directly.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Vec<u8>),
    Null,
    NullArray,
    Array(Vec<Frame>),
}

impl Frame {
    pub fn bulk(s: impl Into<Vec<u8>>) -> Self {
        Self::BulkString(s.into())
    }

    pub fn simple(s: impl Into<String>) -> Self {
        Self::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        Self::Error(s.into())
    }

    pub fn array(items: Vec<Frame>) -> Self {
        Self::Array(items)
    }

    /// If this frame is an `Array` of `BulkString`s (the shape every inbound
    /// request takes), return the decoded command name and argument bytes.
    pub fn as_command(&self) -> Option<(String, Vec<&[u8]>)> {
        let Frame::Array(items) = self else {
            return None;
        };
        if items.is_empty() {
            return None;
        }
        let mut bufs = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Frame::BulkString(b) => bufs.push(b.as_slice()),
                _ => return None,
            }
        }
        let name = String::from_utf8_lossy(bufs[0]).to_ascii_uppercase();
        Some((name, bufs[1..].to_vec()))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::SimpleString(s) => write!(f, "+{s}"),
            Frame::Error(s) => write!(f, "-{s}"),
            Frame::Integer(i) => write!(f, ":{i}"),
            Frame::BulkString(b) => write!(f, "${}", String::from_utf8_lossy(b)),
            Frame::Null => write!(f, "$-1"),
            Frame::NullArray => write!(f, "*-1"),
            Frame::Array(items) => {
                write!(f, "*{}[", items.len())?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
