//! The networking layer: per-connection state and the single-threaded
//! `mio::Poll` event loop that drives everything (SPEC_FULL.md §4.6/§4.7).

pub mod connection;
pub mod server;

pub use connection::Connection;
pub use server::Server;
