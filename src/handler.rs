use std::net::SocketAddr;

use bytes::Buf;
use mio::Token;

use crate::error::{ChannelError, WriteCompletion};

/// Handle a handler callback uses to act on the channel that invoked it.
///
/// The channel owns the handler as a boxed trait object, so a callback
/// cannot simply re-borrow `&mut Channel` to issue a write or a close —
/// that borrow is already taken by the call in progress. Instead the
/// context collects the requested actions and the channel applies them
/// once the callback returns, the same non-reentrant shape the queue's
/// own completions rely on (see `queue.rs`'s "unlink before signal" note).
pub struct ChannelContext<'a> {
    token: Token,
    peer_addr: Option<SocketAddr>,
    pending_writes: &'a mut Vec<(Box<dyn Buf + Send>, WriteCompletion)>,
    close_requested: &'a mut bool,
    read_requested: &'a mut bool,
}

impl<'a> ChannelContext<'a> {
    pub(crate) fn new(
        token: Token,
        peer_addr: Option<SocketAddr>,
        pending_writes: &'a mut Vec<(Box<dyn Buf + Send>, WriteCompletion)>,
        close_requested: &'a mut bool,
        read_requested: &'a mut bool,
    ) -> Self {
        Self { token, peer_addr, pending_writes, close_requested, read_requested }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Queues a write to run once the current callback returns.
    pub fn write(&mut self, buf: Box<dyn Buf + Send>, completion: WriteCompletion) {
        self.pending_writes.push((buf, completion));
    }

    /// Requests `close0` once the current callback returns.
    pub fn close(&mut self) {
        *self.close_requested = true;
    }

    /// Re-requests read interest once the current callback returns.
    ///
    /// With `auto_read` off, `read_from_event_loop` withdraws read
    /// interest after its read loop unless `read_pending` was re-armed
    /// during dispatch (spec §4.4) — this is how a `channel_read`/
    /// `channel_read_complete` handler does that re-arming from inside
    /// the pipeline instead of reaching back into the channel directly.
    pub fn read(&mut self) {
        *self.read_requested = true;
    }
}

/// Inbound/outbound event sink for a single [`crate::channel::Channel`].
///
/// Mirrors the external pipeline-handler collaborator the channel is
/// specified against (an adapter base class with one overridable method
/// per lifecycle event); default no-op bodies are the idiomatic Rust
/// substitute for that adapter class, since a handler usually only cares
/// about a couple of these events.
pub trait ChannelHandler: Send {
    fn channel_registered(&mut self, _ctx: &mut ChannelContext<'_>) {}
    fn channel_unregistered(&mut self, _ctx: &mut ChannelContext<'_>) {}
    fn channel_active(&mut self, _ctx: &mut ChannelContext<'_>) {}
    fn channel_inactive(&mut self, _ctx: &mut ChannelContext<'_>) {}
    fn channel_read(&mut self, _ctx: &mut ChannelContext<'_>, _buf: &mut dyn Buf) {}
    fn channel_read_complete(&mut self, _ctx: &mut ChannelContext<'_>) {}
    fn writability_changed(&mut self, _ctx: &mut ChannelContext<'_>, _writable: bool) {}
    fn error_caught(&mut self, _ctx: &mut ChannelContext<'_>, _err: &ChannelError) {}
}

/// A handler that does nothing; the default for a [`crate::channel::Channel`]
/// built without an explicit one.
#[derive(Default)]
pub struct NoopHandler;

impl ChannelHandler for NoopHandler {}
