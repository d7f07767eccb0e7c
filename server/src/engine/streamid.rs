//! Stream IDs: a `(ms, seq)` pair with lexicographic ordering, the textual
//! forms the wire protocol accepts, and the auto-allocation rules in
//! SPEC_FULL.md §3. Grounded in the reference implementation's
//! `parse_stream_id`/`StreamID` shape (a dash-separated `ms-seq` pair).

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const ZERO: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId { ms: u64::MAX, seq: u64::MAX };

    pub fn is_zero(&self) -> bool {
        self.ms == 0 && self.seq == 0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// How an ID expression was written on the wire; resolving it against the
/// stream's current last ID is what `xadd`/`xrange` do next.
pub enum IdExpr {
    /// Fully explicit `ms-seq`.
    Explicit(StreamId),
    /// `*` — allocate both halves from the wall clock.
    AutoFull,
    /// `<ms>-*` — allocate only the sequence number.
    AutoSeq(u64),
    /// `-` (range start) / `+` (range end) sentinels.
    Min,
    Max,
}

#[derive(Debug, PartialEq, Eq)]
pub struct InvalidStreamId;

/// Parse an XADD id expression (`*`, `<ms>-*`, or `ms-seq`).
pub fn parse_id_expr(s: &str) -> Result<IdExpr, InvalidStreamId> {
    if s == "*" {
        return Ok(IdExpr::AutoFull);
    }
    match s.split_once('-') {
        Some((ms, "*")) => {
            let ms: u64 = ms.parse().map_err(|_| InvalidStreamId)?;
            Ok(IdExpr::AutoSeq(ms))
        }
        Some((ms, seq)) => {
            let ms: u64 = ms.parse().map_err(|_| InvalidStreamId)?;
            let seq: u64 = seq.parse().map_err(|_| InvalidStreamId)?;
            Ok(IdExpr::Explicit(StreamId { ms, seq }))
        }
        None => {
            let ms: u64 = s.parse().map_err(|_| InvalidStreamId)?;
            Ok(IdExpr::Explicit(StreamId { ms, seq: 0 }))
        }
    }
}

/// Parse an XRANGE start bound: `-` is the minimum; a bare `ms` defaults
/// `seq` to 0.
pub fn parse_range_start(s: &str) -> Result<StreamId, InvalidStreamId> {
    if s == "-" {
        return Ok(StreamId::MIN);
    }
    if s == "+" {
        return Ok(StreamId::MAX);
    }
    match parse_id_expr(s).map_err(|_| InvalidStreamId)? {
        IdExpr::Explicit(id) => Ok(id),
        _ => Err(InvalidStreamId),
    }
}

/// Parse an XRANGE end bound: `+` is the maximum; a bare `ms` defaults `seq`
/// to `u64::MAX`.
pub fn parse_range_end(s: &str) -> Result<StreamId, InvalidStreamId> {
    if s == "+" {
        return Ok(StreamId::MAX);
    }
    if s == "-" {
        return Ok(StreamId::MIN);
    }
    if let Some((ms, seq)) = s.split_once('-') {
        let ms: u64 = ms.parse().map_err(|_| InvalidStreamId)?;
        let seq: u64 = seq.parse().map_err(|_| InvalidStreamId)?;
        return Ok(StreamId { ms, seq });
    }
    let ms: u64 = s.parse().map_err(|_| InvalidStreamId)?;
    Ok(StreamId { ms, seq: u64::MAX })
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as u64
}

/// Resolve an `IdExpr` against the stream's current last ID, per the
/// auto-allocation rules in SPEC_FULL.md §3. Returns `None` when the
/// resolved/explicit ID is not strictly greater than `last` (the caller
/// turns that into the appropriate ordering error). The strictly-greater
/// check applies uniformly to every arm: auto-allocated IDs are no more
/// exempt from the monotonicity invariant than explicit ones.
pub fn resolve(expr: IdExpr, last: Option<StreamId>) -> Option<StreamId> {
    let id = match expr {
        IdExpr::Explicit(id) => id,
        IdExpr::AutoFull => {
            let ms = now_ms();
            let seq = match last {
                Some(last) if last.ms == ms => last.seq + 1,
                _ => 0,
            };
            StreamId { ms, seq }
        }
        IdExpr::AutoSeq(ms) => {
            let seq = match last {
                Some(last) if last.ms == ms => last.seq + 1,
                _ if ms == 0 => 1,
                _ => 0,
            };
            StreamId { ms, seq }
        }
        IdExpr::Min | IdExpr::Max => return None,
    };

    if id.is_zero() {
        return None;
    }
    match last {
        Some(last) if id <= last => None,
        _ => Some(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_id_must_exceed_last() {
        let last = Some(StreamId { ms: 5, seq: 2 });
        assert_eq!(
            resolve(IdExpr::Explicit(StreamId { ms: 5, seq: 2 }), last),
            None
        );
        assert_eq!(
            resolve(IdExpr::Explicit(StreamId { ms: 5, seq: 3 }), last),
            Some(StreamId { ms: 5, seq: 3 })
        );
    }

    #[test]
    fn zero_zero_is_always_rejected() {
        assert_eq!(resolve(IdExpr::Explicit(StreamId::ZERO), None), None);
    }

    #[test]
    fn auto_seq_increments_within_same_ms() {
        let last = Some(StreamId { ms: 10, seq: 4 });
        assert_eq!(resolve(IdExpr::AutoSeq(10), last), Some(StreamId { ms: 10, seq: 5 }));
    }

    #[test]
    fn auto_seq_zero_ms_starts_at_one() {
        assert_eq!(resolve(IdExpr::AutoSeq(0), None), Some(StreamId { ms: 0, seq: 1 }));
    }

    #[test]
    fn auto_seq_new_ms_starts_at_zero() {
        let last = Some(StreamId { ms: 3, seq: 9 });
        assert_eq!(resolve(IdExpr::AutoSeq(7), last), Some(StreamId { ms: 7, seq: 0 }));
    }

    #[test]
    fn auto_seq_behind_last_ms_is_rejected() {
        let last = Some(StreamId { ms: 5, seq: 5 });
        assert_eq!(resolve(IdExpr::AutoSeq(3), last), None);
    }

    #[test]
    fn auto_full_is_rejected_when_clock_goes_backward() {
        // last.ms is in the future relative to `now_ms()`; the auto-full
        // candidate would land on `{now, 0}`, which is `<= last` and must
        // be rejected rather than silently inserted out of order.
        let last = Some(StreamId { ms: u64::MAX, seq: 0 });
        assert_eq!(resolve(IdExpr::AutoFull, last), None);
    }

    #[test]
    fn range_bounds_parse_defaults() {
        assert_eq!(parse_range_start("5").unwrap(), StreamId { ms: 5, seq: 0 });
        assert_eq!(parse_range_end("5").unwrap(), StreamId { ms: 5, seq: u64::MAX });
        assert_eq!(parse_range_start("-").unwrap(), StreamId::MIN);
        assert_eq!(parse_range_end("+").unwrap(), StreamId::MAX);
    }
}
