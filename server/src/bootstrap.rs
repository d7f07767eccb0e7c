//! Socket bootstrap (SPEC_FULL.md §3/§6): a non-blocking listener with
//! address reuse and a small backlog, handed off to `mio` once bound.
//! `socket2` gives us the setsockopt calls the std `TcpListener` doesn't
//! expose; the reference implementation does the equivalent via raw
//! `setsockopt(SO_REUSEADDR)` in `socket/socket.cpp`.

use std::net::SocketAddr;

use mio::net::TcpListener as MioTcpListener;
use socket2::{Domain, Socket, Type};

use crate::error::{Error, Result};

const LISTEN_BACKLOG: i32 = 128;

pub fn listen(addr: SocketAddr) -> Result<MioTcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket
        .bind(&addr.into())
        .map_err(|e| Error::io_extra(e, format!("binding to {addr}")))?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(MioTcpListener::from_std(socket.into())?)
}
