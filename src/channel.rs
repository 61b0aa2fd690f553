use std::{io, net::SocketAddr};

use bytes::Buf;
use mio::{Registry, Token};
use tracing::{debug, warn};

use crate::{
    alloc::{BufferAllocator, DefaultBufferAllocator, FixedRecvBufferAllocator, RecvBufferAllocator},
    error::{ChannelError, WriteCompletion},
    handler::{ChannelContext, ChannelHandler, NoopHandler},
    interest::{InterestAction, InterestStateMachine, InterestedEvent},
    options::{AllocatorOption, ChannelOption, ChannelOptionKind, ChannelOptionValue, RecvAllocatorOption},
    queue::{PendingWriteQueue, WriteAttempt},
    socket::Socket,
};

/// Default `writev` fan-out bound (the platform's conventional `IOV_MAX`).
pub const DEFAULT_WRITEV_LIMIT: usize = 1024;
/// Default cap on frames read per readable edge (spec §4.4's starvation bound).
pub const DEFAULT_MAX_MESSAGES_PER_READ: u32 = 16;

/// Outcome of one `flush_now` drain attempt.
///
/// The literal spec pseudocode models this as a two-valued bool
/// (drained vs. partial); a third `Failed` case is added here because a
/// hard write error has to unwind through `error_caught` + `close0`
/// rather than being folded into the would-block/partial case the way
/// the queue's own `consume` does it (see queue.rs's `Some(false)` doc).
enum FlushOutcome {
    Drained,
    Blocked,
    Failed(ChannelError),
}

/// Owner of one connected, non-blocking socket: queue, interest, and the
/// pipeline dispatch that drives a single event-loop registration.
///
/// Generic over [`Socket`] so the drain/read/interest algorithms are
/// testable against an in-memory fake; `Channel<mio::net::TcpStream>` is
/// the concrete shape a real event loop registers.
pub struct Channel<S: Socket = mio::net::TcpStream> {
    socket: S,
    token: Token,
    peer_addr: Option<SocketAddr>,
    open: bool,
    interest: InterestStateMachine,
    read_pending: bool,
    auto_read: bool,
    max_messages_per_read: u32,
    writev_limit: usize,
    recv_alloc: Box<dyn RecvBufferAllocator>,
    buf_alloc: Box<dyn BufferAllocator>,
    queue: PendingWriteQueue,
    handler: Box<dyn ChannelHandler>,
    pending_writes: Vec<(Box<dyn Buf + Send>, WriteCompletion)>,
    close_requested: bool,
    read_requested: bool,
}

impl<S: Socket> Channel<S> {
    pub fn new(socket: S, token: Token, handler: Box<dyn ChannelHandler>) -> Self {
        let peer_addr = socket.peer_addr().ok();
        Self {
            socket,
            token,
            peer_addr,
            open: true,
            interest: InterestStateMachine::default(),
            read_pending: false,
            auto_read: true,
            max_messages_per_read: DEFAULT_MAX_MESSAGES_PER_READ,
            writev_limit: DEFAULT_WRITEV_LIMIT,
            recv_alloc: Box::new(FixedRecvBufferAllocator::default()),
            buf_alloc: Box::new(DefaultBufferAllocator),
            queue: PendingWriteQueue::new(),
            handler,
            pending_writes: Vec::new(),
            close_requested: false,
            read_requested: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Swaps the strategy used to size the next receive buffer (spec
    /// §4.6's `RecvAllocatorOption` category). Also reachable through
    /// [`Channel::set_option`] via `ChannelOption::RecvAllocator`.
    pub fn set_recv_allocator(&mut self, option: RecvAllocatorOption) {
        self.recv_alloc = option.0;
    }

    /// Swaps the strategy `write_slice` uses to allocate its buffer (spec
    /// §4.6's `AllocatorOption` category, distinct from the recv side).
    /// Also reachable through [`Channel::set_option`] via
    /// `ChannelOption::Allocator`.
    pub fn set_buf_allocator(&mut self, option: AllocatorOption) {
        self.buf_alloc = option.0;
    }

    /// Convenience write that copies `data` into a fresh buffer via the
    /// channel's [`BufferAllocator`] — gives callers without their own
    /// `Buf` a way to use `write0` without hand-rolling one.
    pub fn write_slice(&mut self, data: &[u8], completion: WriteCompletion) {
        let mut buf = self.buf_alloc.allocate(data.len());
        buf.extend_from_slice(data);
        self.write0(Box::new(buf.freeze()), completion);
    }

    // ---- 4.5 Channel user contract -----------------------------------

    /// `bind0`: no interest changes, no pipeline event — the raw I/O
    /// result *is* the promise per spec §4.5.
    pub fn bind0(&mut self, addr: SocketAddr) -> Result<(), ChannelError> {
        self.socket.bind(addr).map_err(ChannelError::from)
    }

    pub fn write0(&mut self, buffer: Box<dyn Buf + Send>, completion: WriteCompletion) {
        if !self.open {
            completion(Err(&ChannelError::Closed));
            return;
        }
        self.queue.enqueue(buffer, completion);
    }

    pub fn flush0(&mut self, registry: &Registry) {
        if !self.open {
            return;
        }
        // Open question preserved as-is (spec §9): a user-initiated flush
        // while a write is already armed at the loop is a no-op.
        if matches!(self.interest.current(), InterestedEvent::Write | InterestedEvent::Both) {
            return;
        }
        match self.flush_now() {
            FlushOutcome::Drained => {}
            FlushOutcome::Blocked => {
                let action = self.interest.set_write(true);
                self.apply_interest_action(registry, action);
                if self.open {
                    self.dispatch(registry, |h, ctx| h.writability_changed(ctx, false));
                }
            }
            FlushOutcome::Failed(err) => self.fail_channel(registry, err),
        }
    }

    pub fn flush_from_event_loop(&mut self, registry: &Registry) {
        if !self.open {
            return;
        }
        match self.flush_now() {
            FlushOutcome::Drained => {
                self.dispatch(registry, |h, ctx| h.writability_changed(ctx, true));
                if self.open {
                    // Drop only the write bit; whatever read bit is
                    // currently set already reflects `read_pending`.
                    let action = self.interest.set_write(false);
                    self.apply_interest_action(registry, action);
                }
            }
            FlushOutcome::Blocked => {}
            FlushOutcome::Failed(err) => self.fail_channel(registry, err),
        }
    }

    pub fn start_reading0(&mut self, registry: &Registry) {
        if !self.open {
            return;
        }
        self.read_pending = true;
        let action = self.interest.set_read(true);
        self.apply_interest_action(registry, action);
    }

    pub fn stop_reading0(&mut self, registry: &Registry) {
        if !self.open {
            return;
        }
        self.read_pending = false;
        let action = self.interest.set_read(false);
        self.apply_interest_action(registry, action);
    }

    /// Idempotent: a channel that is already closed succeeds silently.
    pub fn close(&mut self, registry: &Registry) {
        self.close0(registry, ChannelError::Closed);
    }

    fn close0(&mut self, registry: &Registry, error: ChannelError) {
        if !self.open {
            return;
        }
        self.open = false;

        if self.interest.is_registered() {
            if let Err(err) = registry.deregister(&mut self.socket) {
                warn!(token = ?self.token.0, ?err, "close0: deregister failed");
            }
        }
        self.interest.force_none();

        if let Err(err) = self.socket.shutdown() {
            if err.kind() != io::ErrorKind::NotConnected {
                debug!(token = ?self.token.0, ?err, "close0: socket shutdown failed");
            }
        }

        // Pipeline events fire before pending promises fail so handlers
        // observe the channel inactive during their own teardown (spec §4.5).
        self.dispatch(registry, |h, ctx| h.channel_unregistered(ctx));
        self.dispatch(registry, |h, ctx| h.channel_inactive(ctx));

        self.queue.fail_all(&error);
    }

    pub fn register_on_event_loop<F>(&mut self, registry: &Registry, init: F)
    where
        F: FnOnce(&mut Self) -> Result<(), ChannelError>,
    {
        let action = self.interest.set_read(true);
        self.apply_interest_action(registry, action);
        if !self.open {
            return;
        }

        match init(self) {
            Ok(()) => {
                self.read_pending = true;
                self.dispatch(registry, |h, ctx| h.channel_registered(ctx));
                self.dispatch(registry, |h, ctx| h.channel_active(ctx));
            }
            Err(err) => self.fail_channel(registry, err),
        }
    }

    pub fn set_option(&mut self, registry: &Registry, option: ChannelOption) -> Result<(), ChannelError> {
        match option {
            ChannelOption::Socket(name, value) => self.socket.set_so_option(name, value).map_err(ChannelError::from),
            ChannelOption::AutoRead(enabled) => {
                let changed = self.auto_read != enabled;
                self.auto_read = enabled;
                if changed {
                    if enabled {
                        self.start_reading0(registry);
                    } else {
                        self.stop_reading0(registry);
                    }
                }
                Ok(())
            }
            ChannelOption::MaxMessagesPerRead(limit) => {
                self.max_messages_per_read = limit.max(1);
                Ok(())
            }
            ChannelOption::Allocator(option) => {
                self.set_buf_allocator(option);
                Ok(())
            }
            ChannelOption::RecvAllocator(option) => {
                self.set_recv_allocator(option);
                Ok(())
            }
        }
    }

    pub fn get_option(&self, kind: ChannelOptionKind) -> Result<ChannelOptionValue, ChannelError> {
        match kind {
            ChannelOptionKind::Socket(name) => Ok(ChannelOptionValue::Socket(self.socket.get_so_option(name)?)),
            ChannelOptionKind::AutoRead => Ok(ChannelOptionValue::AutoRead(self.auto_read)),
            ChannelOptionKind::MaxMessagesPerRead => Ok(ChannelOptionValue::MaxMessagesPerRead(self.max_messages_per_read)),
        }
    }

    // ---- 4.3 flush algorithm ------------------------------------------

    fn flush_now(&mut self) -> FlushOutcome {
        while self.open {
            let writev_limit = self.writev_limit;
            let socket = &mut self.socket;
            let mut hard_err: Option<io::Error> = None;

            let outcome = self.queue.consume(writev_limit, |attempt| {
                let result = match attempt {
                    WriteAttempt::Single(buf) => socket.write(buf),
                    WriteAttempt::Vector(bufs) => socket.write_vectored(bufs),
                };
                match result {
                    Ok(n) => Some(n),
                    Err(e) if ChannelError::is_would_block(&e) => None,
                    Err(e) => {
                        hard_err = Some(e);
                        None
                    }
                }
            });

            if let Some(err) = hard_err {
                return FlushOutcome::Failed(ChannelError::from(err));
            }

            match outcome {
                None => return FlushOutcome::Drained,
                Some(true) => continue,
                Some(false) => return FlushOutcome::Blocked,
            }
        }
        FlushOutcome::Drained
    }

    // ---- 4.4 read algorithm --------------------------------------------

    pub fn read_from_event_loop(&mut self, registry: &Registry) {
        if !self.open {
            return;
        }
        self.read_pending = false;

        for _ in 0..self.max_messages_per_read.max(1) {
            let mut buf = self.recv_alloc.buffer();
            let capacity = buf.capacity().max(1);
            buf.resize(capacity, 0);

            match self.socket.read(&mut buf) {
                Ok(0) => {
                    // EOF: close immediately, no channel_read_complete (spec
                    // §4.4's pseudocode `return`s before reaching that call;
                    // scenario 5 confirms nothing suppresses the close).
                    self.close0(registry, ChannelError::Closed);
                    return;
                }
                Ok(n) => {
                    buf.truncate(n);
                    self.dispatch(registry, move |h, ctx| h.channel_read(ctx, &mut buf));
                }
                Err(e) if ChannelError::is_would_block(&e) => break,
                Err(e) => {
                    let err = ChannelError::from(e);
                    self.dispatch(registry, |h, ctx| h.error_caught(ctx, &err));
                    self.dispatch(registry, |h, ctx| h.channel_read_complete(ctx));
                    self.close0(registry, err);
                    return;
                }
            }
        }

        self.dispatch(registry, |h, ctx| h.channel_read_complete(ctx));

        if self.auto_read {
            self.read_pending = true;
        }

        if self.open {
            let action = self.interest.set_read(self.read_pending);
            self.apply_interest_action(registry, action);
        }
    }

    // ---- shared plumbing -------------------------------------------------

    fn apply_interest_action(&mut self, registry: &Registry, action: InterestAction) {
        let result = match action {
            InterestAction::Noop => return,
            InterestAction::Register(interest) => registry.register(&mut self.socket, self.token, interest),
            InterestAction::Reregister(interest) => registry.reregister(&mut self.socket, self.token, interest),
            InterestAction::Deregister => registry.deregister(&mut self.socket),
        };

        if let Err(err) = result {
            warn!(token = ?self.token.0, ?err, "interest transition failed");
            self.interest.force_none();
            self.fail_channel(registry, ChannelError::from(err));
        }
    }

    fn fail_channel(&mut self, registry: &Registry, err: ChannelError) {
        self.dispatch(registry, |h, ctx| h.error_caught(ctx, &err));
        self.close0(registry, err);
    }

    /// Runs one pipeline callback with the handler temporarily swapped
    /// out of `self`, giving the closure disjoint `&mut` access to the
    /// rest of the channel's fields through [`ChannelContext`] without a
    /// reentrant `&mut Channel` borrow. Drains whatever the callback
    /// queued via the context once the handler is back in place.
    fn dispatch<F>(&mut self, registry: &Registry, f: F)
    where
        F: FnOnce(&mut dyn ChannelHandler, &mut ChannelContext<'_>),
    {
        let mut handler = std::mem::replace(&mut self.handler, Box::new(NoopHandler));
        {
            let mut ctx = ChannelContext::new(
                self.token,
                self.peer_addr,
                &mut self.pending_writes,
                &mut self.close_requested,
                &mut self.read_requested,
            );
            f(handler.as_mut(), &mut ctx);
        }
        self.handler = handler;
        self.apply_outbox(registry);
    }

    fn apply_outbox(&mut self, registry: &Registry) {
        let writes = std::mem::take(&mut self.pending_writes);
        let had_writes = !writes.is_empty();
        for (buf, completion) in writes {
            self.write0(buf, completion);
        }
        if had_writes && self.open {
            self.flush0(registry);
        }
        if std::mem::take(&mut self.read_requested) && self.open {
            self.start_reading0(registry);
        }
        if self.close_requested {
            self.close_requested = false;
            self.close0(registry, ChannelError::Closed);
        }
    }
}
