//! Blocking coordinator (SPEC_FULL.md §4.4): per-key FIFO waiter queues, a
//! ready list the event loop drains once per iteration, and timeout
//! collection. Grounded in the reference `BlockingManager`
//! (`event_loop/blocking_manager.hpp/cpp`); client identity there is an fd,
//! here it's a `mio::Token`.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use mio::Token;

struct BlockedClient {
    keys: Vec<Vec<u8>>,
    deadline: Option<Instant>,
}

#[derive(Default)]
pub struct BlockingCoordinator {
    key_to_waiters: HashMap<Vec<u8>, VecDeque<Token>>,
    waiter_details: HashMap<Token, BlockedClient>,
    ready_list: VecDeque<Token>,
}

impl BlockingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client` at the tail of every key's queue. `timeout_ms == 0`
    /// means "never" (wait forever, per the resolved BLPOP open question).
    pub fn block(&mut self, client: Token, keys: Vec<Vec<u8>>, timeout_ms: u64) {
        let deadline = if timeout_ms > 0 {
            Some(Instant::now() + Duration::from_millis(timeout_ms))
        } else {
            None
        };
        for key in &keys {
            self.key_to_waiters.entry(key.clone()).or_default().push_back(client);
        }
        self.waiter_details.insert(client, BlockedClient { keys, deadline });
    }

    /// Remove `client`'s waiter record and purge it from every queue it's
    /// on. Returns `false` if the client had already been deregistered
    /// (e.g. woken via a different key in the same batch).
    fn deregister(&mut self, client: Token) -> bool {
        match self.waiter_details.remove(&client) {
            None => false,
            Some(details) => {
                for key in &details.keys {
                    if let Some(q) = self.key_to_waiters.get_mut(key) {
                        q.retain(|c| *c != client);
                        if q.is_empty() {
                            self.key_to_waiters.remove(key);
                        }
                    }
                }
                true
            }
        }
    }

    /// Wake the head of `key`'s queue, skipping stale entries left behind
    /// by an earlier `wake_all`/`unblock` on another key.
    pub fn wake_one(&mut self, key: &[u8]) {
        loop {
            let client = match self.key_to_waiters.get_mut(key).and_then(|q| q.pop_front()) {
                Some(c) => c,
                None => return,
            };
            if self.key_to_waiters.get(key).is_some_and(|q| q.is_empty()) {
                self.key_to_waiters.remove(key);
            }
            if self.deregister(client) {
                self.ready_list.push_back(client);
                return;
            }
        }
    }

    /// Wake every waiter on `key`.
    pub fn wake_all(&mut self, key: &[u8]) {
        let Some(q) = self.key_to_waiters.remove(key) else { return };
        for client in q {
            if self.deregister(client) {
                self.ready_list.push_back(client);
            }
        }
    }

    /// Drop a client's waiter record entirely (disconnect).
    pub fn unblock(&mut self, client: Token) {
        self.deregister(client);
        self.ready_list.retain(|c| *c != client);
    }

    pub fn collect_timeouts(&mut self, now: Instant) -> Vec<Token> {
        let expired: Vec<Token> = self
            .waiter_details
            .iter()
            .filter(|(_, d)| d.deadline.is_some_and(|dl| dl <= now))
            .map(|(c, _)| *c)
            .collect();
        for client in &expired {
            self.deregister(*client);
        }
        expired
    }

    pub fn drain_ready_list(&mut self) -> Vec<Token> {
        self.ready_list.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_wake_order_per_key() {
        let mut c = BlockingCoordinator::new();
        c.block(Token(1), vec![b"k".to_vec()], 0);
        c.block(Token(2), vec![b"k".to_vec()], 0);
        c.wake_one(b"k");
        c.wake_one(b"k");
        assert_eq!(c.drain_ready_list(), vec![Token(1), Token(2)]);
    }

    #[test]
    fn wake_one_on_multi_key_waiter_removes_from_other_queues() {
        let mut c = BlockingCoordinator::new();
        c.block(Token(1), vec![b"a".to_vec(), b"b".to_vec()], 0);
        c.wake_one(b"a");
        // stale entry on "b" must not re-wake the same client
        c.wake_one(b"b");
        assert_eq!(c.drain_ready_list(), vec![Token(1)]);
    }

    #[test]
    fn wake_all_drains_entire_queue() {
        let mut c = BlockingCoordinator::new();
        c.block(Token(1), vec![b"s".to_vec()], 0);
        c.block(Token(2), vec![b"s".to_vec()], 0);
        c.wake_all(b"s");
        assert_eq!(c.drain_ready_list(), vec![Token(1), Token(2)]);
    }

    #[test]
    fn unblock_removes_waiter_and_ready_entry() {
        let mut c = BlockingCoordinator::new();
        c.block(Token(1), vec![b"k".to_vec()], 0);
        c.unblock(Token(1));
        c.wake_one(b"k");
        assert!(c.drain_ready_list().is_empty());
    }

    #[test]
    fn collect_timeouts_only_returns_expired() {
        let mut c = BlockingCoordinator::new();
        c.block(Token(1), vec![b"k".to_vec()], 10_000);
        c.block(Token(2), vec![b"k".to_vec()], 0);
        assert!(c.collect_timeouts(Instant::now()).is_empty());
        let far_future = Instant::now() + Duration::from_secs(3600);
        assert_eq!(c.collect_timeouts(far_future), vec![Token(1)]);
    }
}
