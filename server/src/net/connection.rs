//! Per-connection state (SPEC_FULL.md §4.6): parse buffer, outgoing buffer,
//! transaction state, pub/sub membership, and the deferred command a
//! blocking handler leaves behind. Grounded in the reference
//! `ClientHandler` (`original_source/src/client/client_handler.hpp/cpp`),
//! which owns the same five pieces of state per fd.

use std::collections::HashSet;

use bytes::BytesMut;
use mio::net::TcpStream;

use crate::protocol::{serialize_into, Frame, ParseOutcome, Parser};

pub enum FrameStep {
    Frame(Frame),
    Incomplete,
    Malformed,
}

pub struct Connection {
    pub stream: TcpStream,
    in_buf: BytesMut,
    parser: Parser,

    out_buf: Vec<u8>,
    out_pos: usize,

    pub in_multi: bool,
    pub queue: Vec<Frame>,

    pub subscriptions: HashSet<Vec<u8>>,

    /// Set when a blocking handler returned the block sentinel; re-dispatched
    /// by `reprocess` once the coordinator wakes this client.
    pub deferred: Option<Frame>,

    pub closing: bool,
    pub writable_interest: bool,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            in_buf: BytesMut::new(),
            parser: Parser::new(),
            out_buf: Vec::new(),
            out_pos: 0,
            in_multi: false,
            queue: Vec::new(),
            subscriptions: HashSet::new(),
            deferred: None,
            closing: false,
            writable_interest: false,
        }
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.in_buf.extend_from_slice(data);
    }

    /// Try to pull one complete frame out of the buffered input. Consumed
    /// bytes are dropped from the front of the buffer; on `Incomplete` the
    /// buffer is left untouched so the next read can extend it.
    pub fn try_next_frame(&mut self) -> FrameStep {
        match self.parser.try_parse_one(&self.in_buf) {
            ParseOutcome::Frame(frame, consumed) => {
                let _ = self.in_buf.split_to(consumed);
                FrameStep::Frame(frame)
            }
            ParseOutcome::Incomplete => FrameStep::Incomplete,
            ParseOutcome::Malformed => FrameStep::Malformed,
        }
    }

    pub fn is_subscriber_mode(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    pub fn queue_reply(&mut self, frame: &Frame) {
        serialize_into(frame, &mut self.out_buf);
    }

    pub fn has_pending_output(&self) -> bool {
        self.out_pos < self.out_buf.len()
    }

    pub fn pending_output(&self) -> &[u8] {
        &self.out_buf[self.out_pos..]
    }

    /// Record that `n` bytes of the pending output were written; compacts
    /// the buffer once fully drained.
    pub fn advance_written(&mut self, n: usize) {
        self.out_pos += n;
        if self.out_pos >= self.out_buf.len() {
            self.out_buf.clear();
            self.out_pos = 0;
        }
    }
}
