//! MULTI/EXEC/DISCARD. EXEC replays the queued frames through
//! `execute_command` with blocking disabled — a blocking command whose
//! precondition isn't already met resolves to `Null` rather than
//! registering with the coordinator (SPEC_FULL.md doesn't cover blocking
//! inside a transaction; never suspending the whole pipeline for one
//! queued command is the least surprising reading).

use std::collections::HashMap;

use mio::Token;

use crate::blocking::BlockingCoordinator;
use crate::engine::Store;
use crate::net::connection::Connection;
use crate::protocol::Frame;
use crate::pubsub::PubSub;

use super::args::err;
use super::Outcome;

pub fn multi(conn: &mut Connection) -> Frame {
    if conn.in_multi {
        return err("MULTI calls can not be nested");
    }
    conn.in_multi = true;
    conn.queue.clear();
    Frame::simple("OK")
}

pub fn discard(conn: &mut Connection) -> Frame {
    if !conn.in_multi {
        return err("DISCARD without MULTI");
    }
    conn.in_multi = false;
    conn.queue.clear();
    Frame::simple("OK")
}

#[allow(clippy::too_many_arguments)]
pub fn exec(
    client: Token,
    conn: &mut Connection,
    others: &mut HashMap<Token, Connection>,
    store: &mut Store,
    blocking: &mut BlockingCoordinator,
    pubsub: &mut PubSub,
) -> Frame {
    if !conn.in_multi {
        return err("EXEC without MULTI");
    }
    conn.in_multi = false;
    let queued = std::mem::take(&mut conn.queue);
    let mut replies = Vec::with_capacity(queued.len());
    for frame in queued {
        let reply = match frame.as_command() {
            None => err("Protocol error"),
            Some((name, cargs)) => {
                match super::execute_command(&name, &cargs, client, conn, others, store, blocking, pubsub, false) {
                    Outcome::Reply(f) => f,
                    Outcome::Block { .. } => Frame::Null,
                    Outcome::NoReply => Frame::Null,
                    Outcome::Quit => {
                        conn.closing = true;
                        Frame::simple("OK")
                    }
                }
            }
        };
        replies.push(reply);
    }
    Frame::array(replies)
}
