//! PING/ECHO/COMMAND/TYPE/SET/GET/INCR and the key-namespace-wide commands
//! (DEL/EXISTS/KEYS/DBSIZE/FLUSHALL/CONFIG GET). Grounded in the reference
//! dispatcher's per-command handlers (`command/*.cpp`).

use std::time::Duration;

use crate::engine::Store;
use crate::protocol::Frame;

use super::args::{arity_err, err, parse_i64};
use super::Outcome;

pub fn ping(args: &[&[u8]]) -> Outcome {
    match args.len() {
        0 => Outcome::Reply(Frame::simple("PONG")),
        1 => Outcome::Reply(Frame::bulk(args[0].to_vec())),
        _ => Outcome::Reply(arity_err("ping")),
    }
}

pub fn echo(args: &[&[u8]]) -> Outcome {
    if args.len() != 1 {
        return Outcome::Reply(arity_err("echo"));
    }
    Outcome::Reply(Frame::bulk(args[0].to_vec()))
}

pub fn command() -> Outcome {
    Outcome::Reply(Frame::array(vec![]))
}

pub fn config_get(args: &[&[u8]]) -> Outcome {
    if args.len() != 1 {
        return Outcome::Reply(arity_err("config|get"));
    }
    let param = String::from_utf8_lossy(args[0]).to_ascii_lowercase();
    match param.as_str() {
        "dir" | "dbfilename" => Outcome::Reply(Frame::array(vec![Frame::bulk(param), Frame::bulk("")])),
        _ => Outcome::Reply(Frame::array(vec![])),
    }
}

pub fn type_of(args: &[&[u8]], store: &mut Store) -> Outcome {
    if args.len() != 1 {
        return Outcome::Reply(arity_err("type"));
    }
    Outcome::Reply(Frame::simple(store.type_of(args[0])))
}

pub fn set(args: &[&[u8]], store: &mut Store) -> Outcome {
    if args.len() < 2 {
        return Outcome::Reply(arity_err("set"));
    }
    let key = args[0].to_vec();
    let value = args[1].to_vec();
    let ttl = if args.len() > 2 {
        if args.len() != 4 || !args[2].eq_ignore_ascii_case(b"PX") {
            return Outcome::Reply(err("syntax error"));
        }
        let Some(ms) = parse_i64(args[3]) else {
            return Outcome::Reply(err("value is not an integer or out of range"));
        };
        if ms <= 0 {
            return Outcome::Reply(err("invalid expire time in 'set' command"));
        }
        Some(Duration::from_millis(ms as u64))
    } else {
        None
    };
    store.set(key, value, ttl);
    Outcome::Reply(Frame::simple("OK"))
}

pub fn get(args: &[&[u8]], store: &mut Store) -> Outcome {
    if args.len() != 1 {
        return Outcome::Reply(arity_err("get"));
    }
    match store.get(args[0]) {
        Ok(Some(v)) => Outcome::Reply(Frame::bulk(v)),
        Ok(None) => Outcome::Reply(Frame::Null),
        Err(e) => Outcome::Reply(e.into_frame()),
    }
}

pub fn incr(args: &[&[u8]], store: &mut Store) -> Outcome {
    if args.len() != 1 {
        return Outcome::Reply(arity_err("incr"));
    }
    match store.incr(args[0]) {
        Ok(n) => Outcome::Reply(Frame::Integer(n)),
        Err(e) => Outcome::Reply(e.into_frame()),
    }
}

pub fn del(args: &[&[u8]], store: &mut Store) -> Outcome {
    if args.is_empty() {
        return Outcome::Reply(arity_err("del"));
    }
    let keys: Vec<Vec<u8>> = args.iter().map(|k| k.to_vec()).collect();
    Outcome::Reply(Frame::Integer(store.del(&keys)))
}

pub fn exists(args: &[&[u8]], store: &mut Store) -> Outcome {
    if args.is_empty() {
        return Outcome::Reply(arity_err("exists"));
    }
    let keys: Vec<Vec<u8>> = args.iter().map(|k| k.to_vec()).collect();
    Outcome::Reply(Frame::Integer(store.exists(&keys)))
}

pub fn keys(args: &[&[u8]], store: &mut Store) -> Outcome {
    if args.len() != 1 || args[0] != b"*" {
        return Outcome::Reply(err("KEYS only supports the '*' pattern"));
    }
    let ks = store.keys_matching_star();
    Outcome::Reply(Frame::array(ks.into_iter().map(Frame::bulk).collect()))
}

pub fn dbsize(args: &[&[u8]], store: &Store) -> Outcome {
    if !args.is_empty() {
        return Outcome::Reply(arity_err("dbsize"));
    }
    Outcome::Reply(Frame::Integer(store.dbsize()))
}

pub fn flushall(args: &[&[u8]], store: &mut Store) -> Outcome {
    if !args.is_empty() {
        return Outcome::Reply(arity_err("flushall"));
    }
    store.flushall();
    Outcome::Reply(Frame::simple("OK"))
}
