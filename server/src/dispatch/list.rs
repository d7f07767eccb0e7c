//! LLEN/RPUSH/LPUSH/LRANGE/LPOP/BLPOP. Mutating pushes call `wake_one` on
//! success (SPEC_FULL.md §4.8); BLPOP either replies immediately with
//! `[key, value]` or leaves a `BLPOP_RESUME key` resume frame for the
//! blocking coordinator to re-dispatch once woken.

use crate::blocking::BlockingCoordinator;
use crate::engine::Store;
use crate::protocol::Frame;

use super::args::{arity_err, err, parse_i64, parse_timeout_ms_from_seconds};
use super::Outcome;

pub fn llen(args: &[&[u8]], store: &mut Store) -> Outcome {
    if args.len() != 1 {
        return Outcome::Reply(arity_err("llen"));
    }
    match store.llen(args[0]) {
        Ok(n) => Outcome::Reply(Frame::Integer(n)),
        Err(e) => Outcome::Reply(e.into_frame()),
    }
}

pub fn rpush(args: &[&[u8]], store: &mut Store, blocking: &mut BlockingCoordinator) -> Outcome {
    if args.len() < 2 {
        return Outcome::Reply(arity_err("rpush"));
    }
    let key = args[0];
    let values = args[1..].iter().map(|v| v.to_vec()).collect();
    match store.rpush(key, values) {
        Ok(n) => {
            blocking.wake_one(key);
            Outcome::Reply(Frame::Integer(n))
        }
        Err(e) => Outcome::Reply(e.into_frame()),
    }
}

pub fn lpush(args: &[&[u8]], store: &mut Store, blocking: &mut BlockingCoordinator) -> Outcome {
    if args.len() < 2 {
        return Outcome::Reply(arity_err("lpush"));
    }
    let key = args[0];
    let values = args[1..].iter().map(|v| v.to_vec()).collect();
    match store.lpush(key, values) {
        Ok(n) => {
            blocking.wake_one(key);
            Outcome::Reply(Frame::Integer(n))
        }
        Err(e) => Outcome::Reply(e.into_frame()),
    }
}

pub fn lrange(args: &[&[u8]], store: &mut Store) -> Outcome {
    if args.len() != 3 {
        return Outcome::Reply(arity_err("lrange"));
    }
    let (Some(start), Some(stop)) = (parse_i64(args[1]), parse_i64(args[2])) else {
        return Outcome::Reply(err("value is not an integer or out of range"));
    };
    match store.lrange(args[0], start, stop) {
        Ok(vs) => Outcome::Reply(Frame::array(vs.into_iter().map(Frame::bulk).collect())),
        Err(e) => Outcome::Reply(e.into_frame()),
    }
}

pub fn lpop(args: &[&[u8]], store: &mut Store) -> Outcome {
    if args.is_empty() || args.len() > 2 {
        return Outcome::Reply(arity_err("lpop"));
    }
    let count = if args.len() == 2 {
        match parse_i64(args[1]) {
            Some(n) if n >= 0 => Some(n as usize),
            _ => return Outcome::Reply(err("value is out of range, must be positive")),
        }
    } else {
        None
    };
    match store.lpop(args[0], count) {
        Ok(None) => Outcome::Reply(Frame::Null),
        Ok(Some(vs)) if count.is_none() => {
            Outcome::Reply(vs.into_iter().next().map(Frame::bulk).unwrap_or(Frame::Null))
        }
        Ok(Some(vs)) => Outcome::Reply(Frame::array(vs.into_iter().map(Frame::bulk).collect())),
        Err(e) => Outcome::Reply(e.into_frame()),
    }
}

pub fn blpop(args: &[&[u8]], store: &mut Store, allow_block: bool) -> Outcome {
    if args.len() != 2 {
        return Outcome::Reply(arity_err("blpop"));
    }
    let key = args[0].to_vec();
    let timeout_ms = match parse_timeout_ms_from_seconds(args[1]) {
        Ok(ms) => ms,
        Err(e) => return Outcome::Reply(e.into_frame()),
    };
    match store.try_pop_head(&key) {
        Ok(Some(v)) => Outcome::Reply(pair(key, v)),
        Ok(None) => {
            if allow_block {
                Outcome::Block {
                    resume: Frame::array(vec![Frame::bulk("BLPOP_RESUME"), Frame::bulk(key.clone())]),
                    keys: vec![key],
                    timeout_ms,
                }
            } else {
                Outcome::Reply(Frame::NullArray)
            }
        }
        Err(e) => Outcome::Reply(e.into_frame()),
    }
}

/// Re-attempt a popped-empty BLPOP after the coordinator wakes the client
/// (SPEC_FULL.md §4.8: the resume frame re-dispatches through the engine).
/// In the single-threaded loop the element that triggered `wake_one` is
/// already in the list by the time this runs, so this always succeeds.
pub fn blpop_resume(args: &[&[u8]], store: &mut Store) -> Outcome {
    if args.len() != 1 {
        return Outcome::Reply(arity_err("blpop"));
    }
    let key = args[0].to_vec();
    match store.try_pop_head(&key) {
        Ok(Some(v)) => Outcome::Reply(pair(key, v)),
        Ok(None) => Outcome::Reply(Frame::NullArray),
        Err(e) => Outcome::Reply(e.into_frame()),
    }
}

fn pair(key: Vec<u8>, value: Vec<u8>) -> Frame {
    Frame::array(vec![Frame::bulk(key), Frame::bulk(value)])
}
