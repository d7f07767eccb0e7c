//! SUBSCRIBE/UNSUBSCRIBE/PUBLISH. Subscribe confirmations are written
//! directly to the subscribing connection (one frame per channel, per
//! SPEC_FULL.md §6), so these handlers return `Outcome::NoReply`.

use std::collections::HashMap;

use mio::Token;

use crate::net::connection::Connection;
use crate::protocol::Frame;
use crate::pubsub::PubSub;

use super::args::arity_err;
use super::Outcome;

pub fn subscribe(client: Token, args: &[&[u8]], conn: &mut Connection, pubsub: &mut PubSub) -> Outcome {
    if args.is_empty() {
        return Outcome::Reply(arity_err("subscribe"));
    }
    for ch in args {
        let channel = ch.to_vec();
        pubsub.subscribe(client, channel.clone());
        conn.subscriptions.insert(channel.clone());
        conn.queue_reply(&Frame::array(vec![
            Frame::bulk("subscribe"),
            Frame::bulk(channel),
            Frame::Integer(conn.subscriptions.len() as i64),
        ]));
    }
    Outcome::NoReply
}

pub fn unsubscribe(client: Token, args: &[&[u8]], conn: &mut Connection, pubsub: &mut PubSub) -> Outcome {
    let channels: Vec<Vec<u8>> = if args.is_empty() {
        conn.subscriptions.iter().cloned().collect()
    } else {
        args.iter().map(|c| c.to_vec()).collect()
    };
    if channels.is_empty() {
        conn.queue_reply(&Frame::array(vec![Frame::bulk("unsubscribe"), Frame::Null, Frame::Integer(0)]));
        return Outcome::NoReply;
    }
    for channel in channels {
        pubsub.unsubscribe(client, &channel);
        conn.subscriptions.remove(&channel);
        conn.queue_reply(&Frame::array(vec![
            Frame::bulk("unsubscribe"),
            Frame::bulk(channel),
            Frame::Integer(conn.subscriptions.len() as i64),
        ]));
    }
    Outcome::NoReply
}

pub fn publish(
    client: Token,
    args: &[&[u8]],
    conn: &mut Connection,
    others: &mut HashMap<Token, Connection>,
    pubsub: &mut PubSub,
) -> Outcome {
    if args.len() != 2 {
        return Outcome::Reply(arity_err("publish"));
    }
    let channel = args[0];
    let message = args[1];
    let targets = pubsub.subscribers(channel);
    let payload = Frame::array(vec![
        Frame::bulk("message"),
        Frame::bulk(channel.to_vec()),
        Frame::bulk(message.to_vec()),
    ]);
    for target in &targets {
        super::deliver(client, *target, conn, others, &payload);
    }
    Outcome::Reply(Frame::Integer(targets.len() as i64))
}
