//! Command dispatch (SPEC_FULL.md §4.8): the pub/sub-mode and transaction
//! gates from §4.6, then a name-to-handler match, grounded in the teacher's
//! `queryengine` dispatch style (match on an uppercased command token)
//! rather than a dynamic handler registry.
//!
//! `BLPOP_RESUME` is an internal-only command name: the resume frame a
//! blocked BLPOP leaves behind, never produced by the wire parser from
//! client input.

pub mod args;
mod kv;
mod list;
mod pubsub;
mod stream;
mod txn;

use std::collections::HashMap;

use mio::Token;

use crate::blocking::BlockingCoordinator;
use crate::engine::Store;
use crate::net::connection::Connection;
use crate::protocol::Frame;
use crate::pubsub::PubSub;

/// What a command handler produces. `NoReply` is for handlers (SUBSCRIBE,
/// UNSUBSCRIBE) that already wrote their own frames to the connection.
pub enum Outcome {
    Reply(Frame),
    Block { resume: Frame, keys: Vec<Vec<u8>>, timeout_ms: u64 },
    NoReply,
    Quit,
}

const PUBSUB_ALLOWED: [&str; 6] =
    ["SUBSCRIBE", "UNSUBSCRIBE", "PSUBSCRIBE", "PUNSUBSCRIBE", "PING", "QUIT"];

/// Entry point for a freshly parsed frame arriving on `client`'s connection.
#[allow(clippy::too_many_arguments)]
pub fn handle(
    client: Token,
    frame: Frame,
    conn: &mut Connection,
    others: &mut HashMap<Token, Connection>,
    store: &mut Store,
    blocking: &mut BlockingCoordinator,
    pubsub: &mut PubSub,
) {
    let Some((name, cargs)) = frame.as_command() else {
        conn.queue_reply(&Frame::error("ERR Protocol error: expected array of bulk strings"));
        return;
    };

    if conn.is_subscriber_mode() && !PUBSUB_ALLOWED.contains(&name.as_str()) {
        conn.queue_reply(&args::err(format!(
            "Can't execute '{}': only (P)SUBSCRIBE / (P)UNSUBSCRIBE / PING / QUIT are allowed in this context",
            name.to_lowercase()
        )));
        return;
    }

    if conn.in_multi && name != "EXEC" && name != "DISCARD" {
        if name == "MULTI" {
            conn.queue_reply(&args::err("MULTI calls can not be nested"));
        } else {
            conn.queue_reply(&Frame::simple("QUEUED"));
            conn.queue.push(frame);
        }
        return;
    }

    match name.as_str() {
        "MULTI" => {
            let reply = txn::multi(conn);
            conn.queue_reply(&reply);
        }
        "DISCARD" => {
            let reply = txn::discard(conn);
            conn.queue_reply(&reply);
        }
        "EXEC" => {
            let reply = txn::exec(client, conn, others, store, blocking, pubsub);
            conn.queue_reply(&reply);
        }
        _ => {
            let outcome = execute_command(&name, &cargs, client, conn, others, store, blocking, pubsub, true);
            apply_outcome(outcome, client, conn, blocking);
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn execute_command(
    name: &str,
    cargs: &[&[u8]],
    client: Token,
    conn: &mut Connection,
    others: &mut HashMap<Token, Connection>,
    store: &mut Store,
    blocking: &mut BlockingCoordinator,
    pubsub: &mut PubSub,
    allow_block: bool,
) -> Outcome {
    match name {
        "PING" => kv::ping(cargs),
        "ECHO" => kv::echo(cargs),
        "COMMAND" => kv::command(),
        "TYPE" => kv::type_of(cargs, store),
        "SET" => kv::set(cargs, store),
        "GET" => kv::get(cargs, store),
        "INCR" => kv::incr(cargs, store),
        "DEL" => kv::del(cargs, store),
        "EXISTS" => kv::exists(cargs, store),
        "KEYS" => kv::keys(cargs, store),
        "DBSIZE" => kv::dbsize(cargs, store),
        "FLUSHALL" => kv::flushall(cargs, store),
        "CONFIG" => dispatch_config(cargs),
        "LLEN" => list::llen(cargs, store),
        "RPUSH" => list::rpush(cargs, store, blocking),
        "LPUSH" => list::lpush(cargs, store, blocking),
        "LRANGE" => list::lrange(cargs, store),
        "LPOP" => list::lpop(cargs, store),
        "BLPOP" => list::blpop(cargs, store, allow_block),
        "BLPOP_RESUME" => list::blpop_resume(cargs, store),
        "XADD" => stream::xadd(cargs, store, blocking),
        "XRANGE" => stream::xrange(cargs, store),
        "XREAD" => stream::xread(cargs, store, allow_block),
        "SUBSCRIBE" => pubsub::subscribe(client, cargs, conn, pubsub),
        "UNSUBSCRIBE" => pubsub::unsubscribe(client, cargs, conn, pubsub),
        "PUBLISH" => pubsub::publish(client, cargs, conn, others, pubsub),
        "QUIT" => Outcome::Quit,
        _ => Outcome::Reply(Frame::error(format!("ERR unknown command '{}'", name.to_lowercase()))),
    }
}

fn dispatch_config(cargs: &[&[u8]]) -> Outcome {
    if cargs.is_empty() || !cargs[0].eq_ignore_ascii_case(b"GET") {
        return Outcome::Reply(args::err("syntax error"));
    }
    kv::config_get(&cargs[1..])
}

/// Re-dispatch a deferred command once the coordinator wakes `client`.
#[allow(clippy::too_many_arguments)]
pub fn reprocess(
    client: Token,
    conn: &mut Connection,
    others: &mut HashMap<Token, Connection>,
    store: &mut Store,
    blocking: &mut BlockingCoordinator,
    pubsub: &mut PubSub,
) {
    let Some(resume) = conn.deferred.take() else { return };
    let Some((name, cargs)) = resume.as_command() else { return };
    let outcome = execute_command(&name, &cargs, client, conn, others, store, blocking, pubsub, true);
    apply_outcome(outcome, client, conn, blocking);
}

fn apply_outcome(outcome: Outcome, client: Token, conn: &mut Connection, blocking: &mut BlockingCoordinator) {
    match outcome {
        Outcome::Reply(f) => conn.queue_reply(&f),
        Outcome::NoReply => {}
        Outcome::Block { resume, keys, timeout_ms } => {
            conn.deferred = Some(resume);
            blocking.block(client, keys, timeout_ms);
        }
        Outcome::Quit => {
            conn.queue_reply(&Frame::simple("OK"));
            conn.closing = true;
        }
    }
}

/// Deliver `frame` to `target`'s outgoing buffer, whether that's the
/// currently-dispatching connection or another one.
pub(crate) fn deliver(
    client: Token,
    target: Token,
    conn: &mut Connection,
    others: &mut HashMap<Token, Connection>,
    frame: &Frame,
) {
    if target == client {
        conn.queue_reply(frame);
    } else if let Some(c) = others.get_mut(&target) {
        c.queue_reply(frame);
    }
}
