use bytes::BytesMut;

/// Strategy for producing a fresh read buffer on every
/// [`crate::channel::Channel::read_from_event_loop`] attempt.
///
/// Grounded on the teacher's `TcpStream::rx_buf`: a single reusable
/// buffer that grows on demand rather than allocating per message.
pub trait RecvBufferAllocator: Send {
    fn buffer(&mut self) -> BytesMut;
}

/// Hands back a fresh buffer of `capacity` bytes on every read attempt,
/// per spec §4.1 ("produces a fresh read buffer per read attempt") —
/// unlike the teacher's `TcpStream::rx_buf`, which keeps one buffer alive
/// across reads and only grows it on an oversized frame, a channel reader
/// can't safely reuse a buffer once it's been handed to `channel_read`,
/// since a handler may retain it past the call (e.g. `copy_to_bytes`).
pub struct FixedRecvBufferAllocator {
    capacity: usize,
}

impl FixedRecvBufferAllocator {
    pub const DEFAULT_CAPACITY: usize = 32 * 1024;

    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl Default for FixedRecvBufferAllocator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl RecvBufferAllocator for FixedRecvBufferAllocator {
    fn buffer(&mut self) -> BytesMut {
        BytesMut::with_capacity(self.capacity)
    }
}

/// General-purpose allocator used by convenience helpers (e.g. a
/// `write`-by-slice method) that need to hand the queue an owned buffer
/// without the caller building one itself.
pub trait BufferAllocator: Send {
    fn allocate(&mut self, capacity: usize) -> BytesMut;
}

#[derive(Default)]
pub struct DefaultBufferAllocator;

impl BufferAllocator for DefaultBufferAllocator {
    fn allocate(&mut self, capacity: usize) -> BytesMut {
        BytesMut::with_capacity(capacity)
    }
}
