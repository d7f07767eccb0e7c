//! The data engine: the key namespace and every typed operation against it.
//! Grounded in the reference `DataStore` class (one mutex-guarded map in the
//! original; here just a plain `HashMap` since the whole server runs on one
//! thread — see SPEC_FULL.md's note on the teacher's concurrent `skymap`).

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Instant;

use super::error::{EngineError, EngineResult};
use super::streamid::{self, IdExpr, StreamId};
use super::value::{Expiry, KeyEntry, StoredValue};

pub struct Store {
    map: HashMap<Vec<u8>, KeyEntry>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    /// Look up a key, lazily evicting it if its TTL has passed. Returns
    /// `None` for both "never written" and "expired".
    fn get_live(&mut self, key: &[u8], now: Instant) -> Option<&KeyEntry> {
        let expired = matches!(self.map.get(key), Some(e) if e.is_expired(now));
        if expired {
            self.map.remove(key);
            return None;
        }
        self.map.get(key)
    }

    fn get_live_mut(&mut self, key: &[u8], now: Instant) -> Option<&mut KeyEntry> {
        let expired = matches!(self.map.get(key), Some(e) if e.is_expired(now));
        if expired {
            self.map.remove(key);
            return None;
        }
        self.map.get_mut(key)
    }

    pub fn type_of(&mut self, key: &[u8]) -> &'static str {
        match self.get_live(key, Instant::now()) {
            Some(entry) => entry.value.type_name(),
            None => "none",
        }
    }

    // ---- strings -------------------------------------------------------

    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>, ttl: Option<std::time::Duration>) {
        let expire_at = match ttl {
            Some(d) => Expiry::At(Instant::now() + d),
            None => Expiry::Never,
        };
        self.map.insert(key, KeyEntry::new(StoredValue::String(value), expire_at));
    }

    pub fn get(&mut self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        match self.get_live(key, Instant::now()) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                StoredValue::String(s) => Ok(Some(s.clone())),
                _ => Err(EngineError::WrongType),
            },
        }
    }

    pub fn incr(&mut self, key: &[u8]) -> EngineResult<i64> {
        let now = Instant::now();
        let current = match self.get_live(key, now) {
            None => 0i64,
            Some(entry) => match &entry.value {
                StoredValue::String(s) => std::str::from_utf8(s)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or_else(|| EngineError::invalid("value is not an integer or out of range"))?,
                _ => return Err(EngineError::WrongType),
            },
        };
        let next = current.checked_add(1).ok_or(EngineError::Overflow)?;
        self.map.insert(
            key.to_vec(),
            KeyEntry::new(StoredValue::String(next.to_string().into_bytes()), Expiry::Never),
        );
        Ok(next)
    }

    // ---- lists -----------------------------------------------------------

    fn list_mut(&mut self, key: &[u8]) -> EngineResult<&mut VecDeque<Vec<u8>>> {
        let now = Instant::now();
        if self.get_live(key, now).is_none() {
            self.map.insert(
                key.to_vec(),
                KeyEntry::new(StoredValue::List(VecDeque::new()), Expiry::Never),
            );
        }
        match &mut self.get_live_mut(key, now).expect("just inserted").value {
            StoredValue::List(l) => Ok(l),
            _ => Err(EngineError::WrongType),
        }
    }

    pub fn rpush(&mut self, key: &[u8], values: Vec<Vec<u8>>) -> EngineResult<i64> {
        let list = self.list_mut(key)?;
        list.extend(values);
        Ok(list.len() as i64)
    }

    pub fn lpush(&mut self, key: &[u8], values: Vec<Vec<u8>>) -> EngineResult<i64> {
        let list = self.list_mut(key)?;
        for v in values {
            list.push_front(v);
        }
        Ok(list.len() as i64)
    }

    pub fn llen(&mut self, key: &[u8]) -> EngineResult<i64> {
        match self.get_live(key, Instant::now()) {
            None => Ok(0),
            Some(entry) => match &entry.value {
                StoredValue::List(l) => Ok(l.len() as i64),
                _ => Err(EngineError::WrongType),
            },
        }
    }

    pub fn lrange(&mut self, key: &[u8], start: i64, stop: i64) -> EngineResult<Vec<Vec<u8>>> {
        match self.get_live(key, Instant::now()) {
            None => Ok(vec![]),
            Some(entry) => match &entry.value {
                StoredValue::List(l) => {
                    let len = l.len() as i64;
                    if len == 0 {
                        return Ok(vec![]);
                    }
                    let clamp = |i: i64| -> i64 {
                        let i = if i < 0 { len + i } else { i };
                        i.clamp(0, len - 1)
                    };
                    let (start, stop) = (clamp(start), clamp(stop));
                    if start > stop {
                        return Ok(vec![]);
                    }
                    Ok(l.iter().skip(start as usize).take((stop - start + 1) as usize).cloned().collect())
                }
                _ => Err(EngineError::WrongType),
            },
        }
    }

    /// Remove the key if, after a pop, its list is empty (SPEC_FULL.md §3 invariant).
    fn drop_if_list_empty(&mut self, key: &[u8]) {
        if let Some(StoredValue::List(l)) = self.map.get(key).map(|e| &e.value) {
            if l.is_empty() {
                self.map.remove(key);
            }
        }
    }

    pub fn lpop(&mut self, key: &[u8], count: Option<usize>) -> EngineResult<Option<Vec<Vec<u8>>>> {
        let now = Instant::now();
        match self.get_live_mut(key, now) {
            None => Ok(if count.is_some() { Some(vec![]) } else { None }),
            Some(entry) => {
                let list = match &mut entry.value {
                    StoredValue::List(l) => l,
                    _ => return Err(EngineError::WrongType),
                };
                let out = match count {
                    None => {
                        let popped = list.pop_front();
                        self.drop_if_list_empty(key);
                        return Ok(popped.map(|v| vec![v]));
                    }
                    Some(n) => {
                        let mut popped = Vec::with_capacity(n);
                        for _ in 0..n {
                            match list.pop_front() {
                                Some(v) => popped.push(v),
                                None => break,
                            }
                        }
                        popped
                    }
                };
                self.drop_if_list_empty(key);
                Ok(Some(out))
            }
        }
    }

    /// Pop exactly one element from the head, for `BLPOP`'s immediate and
    /// reprocessed paths. `Ok(None)` means "empty/absent" (the dispatcher
    /// turns that into either a block registration or a timeout `Null`).
    pub fn try_pop_head(&mut self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let now = Instant::now();
        match self.get_live_mut(key, now) {
            None => Ok(None),
            Some(entry) => {
                let list = match &mut entry.value {
                    StoredValue::List(l) => l,
                    _ => return Err(EngineError::WrongType),
                };
                let popped = list.pop_front();
                self.drop_if_list_empty(key);
                Ok(popped)
            }
        }
    }

    // ---- streams -----------------------------------------------------

    fn stream_mut(&mut self, key: &[u8]) -> EngineResult<&mut BTreeMap<StreamId, Vec<Vec<u8>>>> {
        let now = Instant::now();
        if self.get_live(key, now).is_none() {
            self.map.insert(
                key.to_vec(),
                KeyEntry::new(StoredValue::Stream(BTreeMap::new()), Expiry::Never),
            );
        }
        match &mut self.get_live_mut(key, now).expect("just inserted").value {
            StoredValue::Stream(s) => Ok(s),
            _ => Err(EngineError::WrongType),
        }
    }

    pub fn xadd(&mut self, key: &[u8], id_expr: IdExpr, entry: Vec<Vec<u8>>) -> EngineResult<StreamId> {
        let stream = self.stream_mut(key)?;
        let last = stream.keys().next_back().copied();
        let explicit_zero = matches!(id_expr, IdExpr::Explicit(id) if id.is_zero());
        if explicit_zero {
            return Err(EngineError::invalid("The ID specified in XADD must be greater than 0-0"));
        }
        let id = match streamid::resolve(id_expr, last) {
            Some(id) => id,
            None => {
                return Err(EngineError::invalid(
                    "The ID specified in XADD is equal or smaller than the target stream top item",
                ))
            }
        };
        stream.insert(id, entry);
        Ok(id)
    }

    pub fn xrange(
        &mut self,
        key: &[u8],
        start: StreamId,
        end: StreamId,
        count: Option<usize>,
    ) -> EngineResult<Vec<(StreamId, Vec<Vec<u8>>)>> {
        match self.get_live(key, Instant::now()) {
            None => Ok(vec![]),
            Some(entry) => match &entry.value {
                StoredValue::Stream(s) => {
                    let iter = s.range(start..=end).map(|(id, e)| (*id, e.clone()));
                    Ok(match count {
                        Some(n) => iter.take(n).collect(),
                        None => iter.collect(),
                    })
                }
                _ => Err(EngineError::WrongType),
            },
        }
    }

    /// Non-blocking half of `XREAD`: entries strictly greater than each
    /// requested id, per key. Keys with no fresh entries are omitted.
    pub fn xread(
        &mut self,
        keys: &[Vec<u8>],
        ids: &[StreamId],
    ) -> EngineResult<Vec<(Vec<u8>, Vec<(StreamId, Vec<Vec<u8>>)>)>> {
        let mut out = Vec::new();
        for (key, after) in keys.iter().zip(ids.iter()) {
            match self.get_live(key, Instant::now()) {
                None => continue,
                Some(entry) => match &entry.value {
                    StoredValue::Stream(s) => {
                        let lower = StreamId { ms: after.ms, seq: after.seq.saturating_add(1) };
                        let bound = if after.seq == u64::MAX {
                            // no id is > (ms, MAX) within the same ms; skip straight to next ms
                            StreamId { ms: after.ms + 1, seq: 0 }
                        } else {
                            lower
                        };
                        let fresh: Vec<_> = s.range(bound..).map(|(id, e)| (*id, e.clone())).collect();
                        if !fresh.is_empty() {
                            out.push((key.clone(), fresh));
                        }
                    }
                    _ => return Err(EngineError::WrongType),
                },
            }
        }
        Ok(out)
    }

    pub fn last_stream_id(&mut self, key: &[u8]) -> Option<StreamId> {
        match &self.get_live(key, Instant::now())?.value {
            StoredValue::Stream(s) => s.keys().next_back().copied(),
            _ => None,
        }
    }

    // ---- key namespace ops ---------------------------------------------

    pub fn del(&mut self, keys: &[Vec<u8>]) -> i64 {
        let now = Instant::now();
        let mut removed = 0;
        for key in keys {
            if self.get_live(key, now).is_some() {
                self.map.remove(key);
                removed += 1;
            }
        }
        removed
    }

    pub fn exists(&mut self, keys: &[Vec<u8>]) -> i64 {
        let now = Instant::now();
        keys.iter().filter(|k| self.get_live(k, now).is_some()).count() as i64
    }

    pub fn keys_matching_star(&mut self) -> Vec<Vec<u8>> {
        let now = Instant::now();
        let expired: Vec<Vec<u8>> = self
            .map
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for k in expired {
            self.map.remove(&k);
        }
        self.map.keys().cloned().collect()
    }

    pub fn dbsize(&self) -> i64 {
        let now = Instant::now();
        self.map.values().filter(|e| !e.is_expired(now)).count() as i64
    }

    pub fn flushall(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn set_get_roundtrip() {
        let mut s = Store::new();
        s.set(b"k".to_vec(), b"v".to_vec(), None);
        assert_eq!(s.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn ttl_expires_lazily() {
        let mut s = Store::new();
        s.set(b"k".to_vec(), b"v".to_vec(), Some(Duration::from_millis(1)));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(s.get(b"k").unwrap(), None);
        assert_eq!(s.type_of(b"k"), "none");
    }

    #[test]
    fn incr_creates_and_increments() {
        let mut s = Store::new();
        assert_eq!(s.incr(b"n").unwrap(), 1);
        assert_eq!(s.incr(b"n").unwrap(), 2);
    }

    #[test]
    fn incr_on_non_integer_string_fails() {
        let mut s = Store::new();
        s.set(b"n".to_vec(), b"x".to_vec(), None);
        assert!(s.incr(b"n").is_err());
    }

    #[test]
    fn wrong_type_on_list_ops_against_string() {
        let mut s = Store::new();
        s.set(b"k".to_vec(), b"v".to_vec(), None);
        assert_eq!(s.rpush(b"k", vec![b"a".to_vec()]), Err(EngineError::WrongType));
    }

    #[test]
    fn rpush_lpush_lrange_lpop_llen() {
        let mut s = Store::new();
        assert_eq!(s.rpush(b"l", vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]).unwrap(), 3);
        assert_eq!(
            s.lrange(b"l", 0, -1).unwrap(),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
        assert_eq!(s.lpop(b"l", Some(2)).unwrap().unwrap(), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(s.llen(b"l").unwrap(), 1);
    }

    #[test]
    fn list_removed_when_emptied() {
        let mut s = Store::new();
        s.rpush(b"l", vec![b"a".to_vec()]).unwrap();
        s.try_pop_head(b"l").unwrap();
        assert_eq!(s.type_of(b"l"), "none");
    }

    #[test]
    fn lrange_clamps_and_empties_on_crossed_bounds() {
        let mut s = Store::new();
        s.rpush(b"l", vec![b"a".to_vec(), b"b".to_vec()]).unwrap();
        assert_eq!(s.lrange(b"l", 5, 10).unwrap(), vec![b"b".to_vec()]);
        assert_eq!(s.lrange(b"l", 1, 0).unwrap(), Vec::<Vec<u8>>::new());
    }

    #[test]
    fn xadd_enforces_strictly_increasing_ids() {
        let mut s = Store::new();
        let id1 = s.xadd(b"s", IdExpr::Explicit(StreamId { ms: 1, seq: 1 }), vec![b"f".to_vec(), b"v".to_vec()]).unwrap();
        assert_eq!(id1, StreamId { ms: 1, seq: 1 });
        assert!(s.xadd(b"s", IdExpr::Explicit(StreamId { ms: 1, seq: 1 }), vec![]).is_err());
        assert!(s.xadd(b"s", IdExpr::Explicit(StreamId { ms: 0, seq: 0 }), vec![]).is_err());
    }

    #[test]
    fn xadd_rejects_auto_seq_behind_the_current_maximum() {
        let mut s = Store::new();
        s.xadd(b"s", IdExpr::Explicit(StreamId { ms: 5, seq: 5 }), vec![b"f".to_vec(), b"v".to_vec()]).unwrap();
        assert!(s.xadd(b"s", IdExpr::AutoSeq(3), vec![b"f".to_vec(), b"v".to_vec()]).is_err());
    }

    #[test]
    fn xrange_returns_entries_in_order() {
        let mut s = Store::new();
        s.xadd(b"s", IdExpr::Explicit(StreamId { ms: 1, seq: 0 }), vec![b"a".to_vec()]).unwrap();
        s.xadd(b"s", IdExpr::Explicit(StreamId { ms: 2, seq: 0 }), vec![b"b".to_vec()]).unwrap();
        let entries = s.xrange(b"s", StreamId::MIN, StreamId::MAX, None).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, StreamId { ms: 1, seq: 0 });
        assert_eq!(entries[1].0, StreamId { ms: 2, seq: 0 });
    }

    #[test]
    fn xread_only_returns_strictly_newer_entries() {
        let mut s = Store::new();
        s.xadd(b"s", IdExpr::Explicit(StreamId { ms: 1, seq: 0 }), vec![b"a".to_vec()]).unwrap();
        let out = s.xread(&[b"s".to_vec()], &[StreamId { ms: 1, seq: 0 }]).unwrap();
        assert!(out.is_empty());
        s.xadd(b"s", IdExpr::Explicit(StreamId { ms: 2, seq: 0 }), vec![b"b".to_vec()]).unwrap();
        let out = s.xread(&[b"s".to_vec()], &[StreamId { ms: 1, seq: 0 }]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1.len(), 1);
    }

    #[test]
    fn del_exists_dbsize_flushall() {
        let mut s = Store::new();
        s.set(b"a".to_vec(), b"1".to_vec(), None);
        assert_eq!(s.exists(&[b"a".to_vec(), b"a".to_vec(), b"missing".to_vec()]), 2);
        assert_eq!(s.del(&[b"a".to_vec(), b"missing".to_vec()]), 1);
        s.set(b"b".to_vec(), b"1".to_vec(), None);
        assert_eq!(s.dbsize(), 1);
        s.flushall();
        assert_eq!(s.dbsize(), 0);
    }
}
