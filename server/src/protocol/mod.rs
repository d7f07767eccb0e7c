//! The wire codec: parser, serializer and the `Frame` value they speak.

pub mod frame;
pub mod parser;
pub mod ser;

pub use frame::Frame;
pub use parser::{ParseOutcome, Parser};
pub use ser::{serialize, serialize_into};
