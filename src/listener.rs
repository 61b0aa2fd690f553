use std::{io, net::SocketAddr};

use mio::{Interest, Registry, Token, net::TcpListener};
use tracing::warn;

use crate::error::ChannelError;

/// Thin wrapper over a bound, listening TCP socket.
///
/// Stripped of everything that isn't accepting: no reconnect/backoff
/// policy, no broadcast-to-many-peers registry, no telemetry — those are
/// server/acceptor and connection-establishment concerns out of scope
/// here. What's left is the part a listener must always do: bind,
/// register for readability, and drain `accept()` until it would block.
pub struct Listener {
    listener: TcpListener,
    token: Token,
}

impl Listener {
    pub fn bind(registry: &Registry, addr: SocketAddr, token: Token) -> io::Result<Self> {
        let mut listener = TcpListener::bind(addr)?;
        registry.register(&mut listener, token, Interest::READABLE)?;
        Ok(Self { listener, token })
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Drains every connection the kernel has ready to hand back,
    /// calling `on_accept` for each, until `accept()` would block.
    ///
    /// A hard `accept()` failure is logged and returned to the caller,
    /// matching the teacher's own accept loop (`connector.rs`'s
    /// `handle_event`), which treats any non-`Ok` result — would-block or
    /// otherwise — as "stop accepting until the next readable edge" rather
    /// than retrying in a tight loop.
    pub fn accept_all<F>(&mut self, mut on_accept: F) -> Result<(), ChannelError>
    where
        F: FnMut(mio::net::TcpStream, SocketAddr),
    {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => on_accept(stream, addr),
                Err(e) if ChannelError::is_would_block(&e) => return Ok(()),
                Err(e) => {
                    warn!(token = ?self.token.0, ?e, "listener accept failed");
                    return Err(ChannelError::from(e));
                }
            }
        }
    }

    pub fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        registry.deregister(&mut self.listener)
    }
}
