//! The event loop (SPEC_FULL.md §4.7): one `mio::Poll`, the listener, every
//! client socket, the key namespace, the blocking coordinator and the
//! pub/sub registry, all owned here and nowhere else. Grounded in the
//! reference `EpollEventLoop::run` (`event_loop/epoll_event_loop.cpp`) —
//! accept, read-dispatch, ready-list drain, timeout sweep, in that order —
//! with `mio::Poll` standing in for `epoll_wait` and `signal_hook_mio`
//! standing in for the reference's `std::atomic<bool> running` flag.

use std::collections::HashMap;
use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use mio::net::TcpListener;
use mio::{event::Event, Events, Interest, Poll, Token};
use signal_hook::consts::SIGINT;
use signal_hook_mio::v0_8::Signals;

use crate::blocking::BlockingCoordinator;
use crate::dispatch;
use crate::engine::Store;
use crate::error::{Error, Result};
use crate::net::connection::{Connection, FrameStep};
use crate::protocol::Frame;
use crate::pubsub::PubSub;

const LISTENER: Token = Token(0);
const SIGNALS: Token = Token(1);
const FIRST_CLIENT_TOKEN: usize = 2;
const TICK: Duration = Duration::from_secs(1);
const READ_CHUNK: usize = 16 * 1024;

pub struct Server {
    poll: Poll,
    listener: TcpListener,
    signals: Signals,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    store: Store,
    blocking: BlockingCoordinator,
    pubsub: PubSub,
}

impl Server {
    pub fn new(mut listener: TcpListener) -> Result<Self> {
        let poll = Poll::new().map_err(|e| Error::io_extra(e, "creating the poll instance"))?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(|e| Error::io_extra(e, "registering the listener"))?;
        let mut signals = Signals::new([SIGINT]).map_err(|e| Error::io_extra(e, "installing the SIGINT handler"))?;
        poll.registry()
            .register(&mut signals, SIGNALS, Interest::READABLE)
            .map_err(|e| Error::io_extra(e, "registering the signal handler"))?;
        Ok(Self {
            poll,
            listener,
            signals,
            connections: HashMap::new(),
            next_token: FIRST_CLIENT_TOKEN,
            store: Store::new(),
            blocking: BlockingCoordinator::new(),
            pubsub: PubSub::new(),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(128);
        let mut shutting_down = false;

        loop {
            match self.poll.poll(&mut events, Some(TICK)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io_extra(e, "polling for readiness")),
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_loop().map_err(|e| Error::io_extra(e, "accepting a connection"))?,
                    SIGNALS => {
                        for signal in self.signals.pending() {
                            if signal == SIGINT {
                                log::info!("received SIGINT, shutting down");
                                shutting_down = true;
                            }
                        }
                    }
                    token => self.service_client(token, event),
                }
            }

            self.drain_ready_list();
            self.drain_timeouts();
            self.arm_writers();

            if shutting_down {
                break;
            }
        }

        let _ = self.poll.registry().deregister(&mut self.listener);
        Ok(())
    }

    fn accept_loop(&mut self) -> io::Result<()> {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;
                    self.poll.registry().register(&mut stream, token, Interest::READABLE)?;
                    log::debug!("accepted {addr} as {token:?}");
                    self.connections.insert(token, Connection::new(stream));
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn service_client(&mut self, token: Token, event: &Event) {
        if event.is_error() || event.is_read_closed() {
            self.teardown(token);
            return;
        }
        if event.is_readable() {
            self.read_step(token);
        }
        if event.is_writable() && self.connections.contains_key(&token) {
            self.write_step(token);
        }
    }

    fn read_step(&mut self, token: Token) {
        let Some(mut conn) = self.connections.remove(&token) else { return };
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match conn.stream.read(&mut buf) {
                Ok(0) => {
                    conn.closing = true;
                    break;
                }
                Ok(n) => conn.feed(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => {
                    conn.closing = true;
                    break;
                }
            }
        }

        while !conn.closing {
            match conn.try_next_frame() {
                FrameStep::Frame(frame) => dispatch::handle(
                    token,
                    frame,
                    &mut conn,
                    &mut self.connections,
                    &mut self.store,
                    &mut self.blocking,
                    &mut self.pubsub,
                ),
                FrameStep::Incomplete => break,
                FrameStep::Malformed => {
                    conn.queue_reply(&Frame::error("ERR Protocol error: invalid request"));
                    conn.closing = true;
                }
            }
        }

        self.finish_step(token, conn);
    }

    fn write_step(&mut self, token: Token) {
        let Some(mut conn) = self.connections.remove(&token) else { return };
        loop {
            let pending = conn.pending_output();
            if pending.is_empty() {
                break;
            }
            match conn.stream.write(pending) {
                Ok(0) => break,
                Ok(n) => conn.advance_written(n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => {
                    conn.closing = true;
                    break;
                }
            }
        }
        self.finish_step(token, conn);
    }

    fn finish_step(&mut self, token: Token, conn: Connection) {
        let disconnect = conn.closing && !conn.has_pending_output();
        self.connections.insert(token, conn);
        if disconnect {
            self.teardown(token);
        } else {
            self.update_write_interest(token);
        }
    }

    fn drain_ready_list(&mut self) {
        for token in self.blocking.drain_ready_list() {
            let Some(mut conn) = self.connections.remove(&token) else { continue };
            dispatch::reprocess(
                token,
                &mut conn,
                &mut self.connections,
                &mut self.store,
                &mut self.blocking,
                &mut self.pubsub,
            );
            self.finish_step(token, conn);
        }
    }

    fn drain_timeouts(&mut self) {
        for token in self.blocking.collect_timeouts(Instant::now()) {
            if let Some(conn) = self.connections.get_mut(&token) {
                conn.deferred = None;
                conn.queue_reply(&Frame::NullArray);
            }
        }
    }

    fn arm_writers(&mut self) {
        let stale: Vec<Token> = self
            .connections
            .iter()
            .filter(|(_, c)| c.has_pending_output() != c.writable_interest)
            .map(|(t, _)| *t)
            .collect();
        for token in stale {
            self.update_write_interest(token);
        }
    }

    fn update_write_interest(&mut self, token: Token) {
        let Some(conn) = self.connections.get_mut(&token) else { return };
        let want_write = conn.has_pending_output();
        if want_write == conn.writable_interest {
            return;
        }
        conn.writable_interest = want_write;
        let interest = if want_write { Interest::READABLE | Interest::WRITABLE } else { Interest::READABLE };
        let _ = self.poll.registry().reregister(&mut conn.stream, token, interest);
    }

    fn teardown(&mut self, token: Token) {
        if let Some(mut conn) = self.connections.remove(&token) {
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
        self.blocking.unblock(token);
        self.pubsub.unsubscribe_all(token);
    }
}
