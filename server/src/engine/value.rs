//! The stored-value tagged union and the key entry that wraps it with an
//! optional TTL. Mirrors the reference `DataStore::Entry` shape (a value
//! plus a steady-clock deadline) but, per the arena-free design note, each
//! key owns its value outright — there are no cross-references to manage.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::time::Instant;

use super::streamid::StreamId;

pub type StreamEntry = Vec<Vec<u8>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    String(Vec<u8>),
    List(VecDeque<Vec<u8>>),
    Stream(BTreeMap<StreamId, StreamEntry>),
}

impl StoredValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            StoredValue::String(_) => "string",
            StoredValue::List(_) => "list",
            StoredValue::Stream(_) => "stream",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    At(Instant),
}

impl Expiry {
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self, Expiry::At(deadline) if now >= *deadline)
    }
}

#[derive(Debug, Clone)]
pub struct KeyEntry {
    pub value: StoredValue,
    pub expire_at: Expiry,
}

impl KeyEntry {
    pub fn new(value: StoredValue, expire_at: Expiry) -> Self {
        Self { value, expire_at }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expire_at.is_expired(now)
    }
}
