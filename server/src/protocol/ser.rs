//! Serializer: a total, infallible function from `Frame` to wire bytes.

use super::frame::Frame;

pub fn serialize(frame: &Frame) -> Vec<u8> {
    let mut out = Vec::new();
    write_frame(frame, &mut out);
    out
}

pub fn serialize_into(frame: &Frame, out: &mut Vec<u8>) {
    write_frame(frame, out);
}

fn write_frame(frame: &Frame, out: &mut Vec<u8>) {
    match frame {
        Frame::SimpleString(s) => {
            out.push(b'+');
            out.extend_from_slice(s.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Frame::Error(s) => {
            out.push(b'-');
            out.extend_from_slice(s.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Frame::Integer(i) => {
            out.push(b':');
            out.extend_from_slice(i.to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Frame::Null => out.extend_from_slice(b"$-1\r\n"),
        Frame::NullArray => out.extend_from_slice(b"*-1\r\n"),
        Frame::BulkString(bytes) => {
            out.push(b'$');
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(bytes);
            out.extend_from_slice(b"\r\n");
        }
        Frame::Array(items) => {
            out.push(b'*');
            out.extend_from_slice(items.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            for item in items {
                write_frame(item, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parser::{ParseOutcome, Parser};

    fn roundtrip(frame: Frame) {
        let bytes = serialize(&frame);
        let mut p = Parser::new();
        match p.try_parse_one(&bytes) {
            ParseOutcome::Frame(parsed, consumed) => {
                assert_eq!(consumed, bytes.len());
                assert_eq!(parsed, frame);
            }
            other => panic!("expected complete frame, got {other:?}"),
        }
    }

    #[test]
    fn roundtrips_every_variant() {
        roundtrip(Frame::SimpleString("OK".into()));
        roundtrip(Frame::Error("ERR nope".into()));
        roundtrip(Frame::Integer(-17));
        roundtrip(Frame::BulkString(b"hello world".to_vec()));
        roundtrip(Frame::Null);
        roundtrip(Frame::NullArray);
        roundtrip(Frame::Array(vec![]));
        roundtrip(Frame::Array(vec![
            Frame::BulkString(b"a".to_vec()),
            Frame::Integer(1),
            Frame::Null,
        ]));
    }

    #[test]
    fn empty_array_is_star_zero() {
        assert_eq!(serialize(&Frame::Array(vec![])), b"*0\r\n");
    }

    #[test]
    fn null_is_dollar_minus_one() {
        assert_eq!(serialize(&Frame::Null), b"$-1\r\n");
    }
}
