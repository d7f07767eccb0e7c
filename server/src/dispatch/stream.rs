//! XADD/XRANGE/XREAD. XADD calls `wake_all` on success; XREAD's `BLOCK`
//! variant leaves a canonicalized `XREAD ... STREAMS keys ids` resume frame
//! so reprocessing never re-resolves a `$` against a moving target.

use crate::blocking::BlockingCoordinator;
use crate::engine::streamid::{self, IdExpr, StreamId};
use crate::engine::Store;
use crate::protocol::Frame;

use super::args::{arity_err, err, parse_timeout_ms, parse_usize, utf8};
use super::Outcome;

pub fn xadd(args: &[&[u8]], store: &mut Store, blocking: &mut BlockingCoordinator) -> Outcome {
    if args.len() < 4 || (args.len() - 2) % 2 != 0 {
        return Outcome::Reply(arity_err("xadd"));
    }
    let key = args[0];
    let Some(id_str) = utf8(args[1]) else {
        return Outcome::Reply(err("Invalid stream ID specified as stream command argument"));
    };
    let id_expr = match streamid::parse_id_expr(id_str) {
        Ok(e) => e,
        Err(_) => return Outcome::Reply(err("Invalid stream ID specified as stream command argument")),
    };
    let entry = args[2..].iter().map(|v| v.to_vec()).collect();
    match store.xadd(key, id_expr, entry) {
        Ok(id) => {
            blocking.wake_all(key);
            Outcome::Reply(Frame::bulk(id.to_string()))
        }
        Err(e) => Outcome::Reply(e.into_frame()),
    }
}

pub fn xrange(args: &[&[u8]], store: &mut Store) -> Outcome {
    if args.len() != 3 && args.len() != 5 {
        return Outcome::Reply(arity_err("xrange"));
    }
    let key = args[0];
    let (Some(start_s), Some(end_s)) = (utf8(args[1]), utf8(args[2])) else {
        return Outcome::Reply(err("Invalid stream ID specified as stream command argument"));
    };
    let (Ok(start), Ok(end)) = (streamid::parse_range_start(start_s), streamid::parse_range_end(end_s)) else {
        return Outcome::Reply(err("Invalid stream ID specified as stream command argument"));
    };
    let count = if args.len() == 5 {
        if !args[3].eq_ignore_ascii_case(b"COUNT") {
            return Outcome::Reply(err("syntax error"));
        }
        match parse_usize(args[4]) {
            Some(n) => Some(n),
            None => return Outcome::Reply(err("value is not an integer or out of range")),
        }
    } else {
        None
    };
    match store.xrange(key, start, end, count) {
        Ok(entries) => Outcome::Reply(render_entries(entries)),
        Err(e) => Outcome::Reply(e.into_frame()),
    }
}

fn render_entries(entries: Vec<(StreamId, Vec<Vec<u8>>)>) -> Frame {
    Frame::array(
        entries
            .into_iter()
            .map(|(id, fields)| {
                Frame::array(vec![
                    Frame::bulk(id.to_string()),
                    Frame::array(fields.into_iter().map(Frame::bulk).collect()),
                ])
            })
            .collect(),
    )
}

fn resolve_xread_id(s: &[u8], key: &[u8], store: &mut Store) -> Option<StreamId> {
    let s = utf8(s)?;
    if s == "$" {
        return Some(store.last_stream_id(key).unwrap_or(StreamId::ZERO));
    }
    match streamid::parse_id_expr(s).ok()? {
        IdExpr::Explicit(id) => Some(id),
        _ => None,
    }
}

pub fn xread(args: &[&[u8]], store: &mut Store, allow_block: bool) -> Outcome {
    let mut i = 0;
    let mut count = None;
    let mut block_ms = None;
    loop {
        match args.get(i) {
            None => return Outcome::Reply(err("syntax error")),
            Some(tok) if tok.eq_ignore_ascii_case(b"COUNT") => {
                match args.get(i + 1).and_then(|a| parse_usize(a)) {
                    Some(n) => count = Some(n),
                    None => return Outcome::Reply(err("value is not an integer or out of range")),
                }
                i += 2;
            }
            Some(tok) if tok.eq_ignore_ascii_case(b"BLOCK") => {
                match args.get(i + 1).and_then(|a| parse_timeout_ms(a)) {
                    Some(ms) => block_ms = Some(ms),
                    None => return Outcome::Reply(err("timeout is not an integer or out of range")),
                }
                i += 2;
            }
            Some(tok) if tok.eq_ignore_ascii_case(b"STREAMS") => {
                i += 1;
                break;
            }
            _ => return Outcome::Reply(err("syntax error")),
        }
    }
    let rest = &args[i..];
    if rest.is_empty() || rest.len() % 2 != 0 {
        return Outcome::Reply(err(
            "Unbalanced XREAD list of streams: for each stream key an ID or '$' must be specified.",
        ));
    }
    let n = rest.len() / 2;
    let keys: Vec<Vec<u8>> = rest[..n].iter().map(|k| k.to_vec()).collect();
    let mut ids = Vec::with_capacity(n);
    for (key, id_arg) in keys.iter().zip(rest[n..].iter()) {
        match resolve_xread_id(id_arg, key, store) {
            Some(id) => ids.push(id),
            None => return Outcome::Reply(err("Invalid stream ID specified as stream command argument")),
        }
    }

    match store.xread(&keys, &ids) {
        Ok(results) if !results.is_empty() => Outcome::Reply(Frame::array(
            results
                .into_iter()
                .map(|(key, entries)| Frame::array(vec![Frame::bulk(key), render_entries(entries)]))
                .collect(),
        )),
        Ok(_) => {
            if allow_block {
                if let Some(timeout_ms) = block_ms {
                    let resume = build_resume(count, &keys, &ids);
                    return Outcome::Block { resume, keys, timeout_ms };
                }
            }
            Outcome::Reply(Frame::NullArray)
        }
        Err(e) => Outcome::Reply(e.into_frame()),
    }
}

fn build_resume(count: Option<usize>, keys: &[Vec<u8>], ids: &[StreamId]) -> Frame {
    let mut parts = vec![Frame::bulk("XREAD")];
    if let Some(c) = count {
        parts.push(Frame::bulk("COUNT"));
        parts.push(Frame::bulk(c.to_string()));
    }
    parts.push(Frame::bulk("STREAMS"));
    for key in keys {
        parts.push(Frame::bulk(key.clone()));
    }
    for id in ids {
        parts.push(Frame::bulk(id.to_string()));
    }
    Frame::array(parts)
}
