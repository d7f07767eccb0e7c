//! Pub/sub registry (SPEC_FULL.md §4.5): channel membership and fan-out.
//! Grounded in the reference `PubSubManager`
//! (`pubsub/pubsub_manager.hpp/cpp`); clients are `mio::Token`s rather than
//! `ClientHandler*`, and delivery is left to the caller (the event loop owns
//! every connection's outgoing buffer, so this registry only says *who*).

use std::collections::{HashMap, HashSet};

use mio::Token;

#[derive(Default)]
pub struct PubSub {
    channel_subs: HashMap<Vec<u8>, HashSet<Token>>,
}

impl PubSub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, client: Token, channel: Vec<u8>) -> bool {
        self.channel_subs.entry(channel).or_default().insert(client)
    }

    pub fn unsubscribe(&mut self, client: Token, channel: &[u8]) -> bool {
        let Some(set) = self.channel_subs.get_mut(channel) else { return false };
        let removed = set.remove(&client);
        if set.is_empty() {
            self.channel_subs.remove(channel);
        }
        removed
    }

    /// Remove `client` from every channel it's subscribed to (disconnect).
    pub fn unsubscribe_all(&mut self, client: Token) -> usize {
        let mut removed = 0;
        self.channel_subs.retain(|_, set| {
            if set.remove(&client) {
                removed += 1;
            }
            !set.is_empty()
        });
        removed
    }

    /// Subscribers of `channel`, for the caller to deliver a `message` frame
    /// to. Returns an empty vec (not an error) for an unknown channel.
    pub fn subscribers(&self, channel: &[u8]) -> Vec<Token> {
        self.channel_subs.get(channel).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    pub fn channel_count(&self) -> usize {
        self.channel_subs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_then_publish_lists_subscriber() {
        let mut ps = PubSub::new();
        ps.subscribe(Token(1), b"ch".to_vec());
        assert_eq!(ps.subscribers(b"ch"), vec![Token(1)]);
    }

    #[test]
    fn unsubscribe_cleans_up_empty_channel() {
        let mut ps = PubSub::new();
        ps.subscribe(Token(1), b"ch".to_vec());
        ps.unsubscribe(Token(1), b"ch");
        assert_eq!(ps.channel_count(), 0);
    }

    #[test]
    fn unsubscribe_all_removes_from_every_channel() {
        let mut ps = PubSub::new();
        ps.subscribe(Token(1), b"a".to_vec());
        ps.subscribe(Token(1), b"b".to_vec());
        ps.subscribe(Token(2), b"a".to_vec());
        assert_eq!(ps.unsubscribe_all(Token(1)), 2);
        assert_eq!(ps.subscribers(b"a"), vec![Token(2)]);
        assert_eq!(ps.channel_count(), 1);
    }

    #[test]
    fn publish_to_unknown_channel_is_empty() {
        let ps = PubSub::new();
        assert!(ps.subscribers(b"nope").is_empty());
    }
}
