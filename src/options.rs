use crate::{
    alloc::{BufferAllocator, RecvBufferAllocator},
    socket::SocketOptionName,
};

/// Typed option registry (spec §4.6).
///
/// A runtime-dynamic option map would need an "unknown option" failure
/// mode at every lookup; a closed enum moves that failure to compile
/// time instead — every arm of `Channel::set_option`/`get_option` is
/// exhaustive, so "unknown option" simply cannot be constructed.
///
/// `Allocator`/`RecvAllocator` carry the same swap-a-strategy payload as
/// [`AllocatorOption`]/[`RecvAllocatorOption`] rather than duplicating
/// their fields inline, so `set_option` and the dedicated
/// `Channel::set_buf_allocator`/`set_recv_allocator` setters both go
/// through one constructor.
pub enum ChannelOption {
    Socket(SocketOptionName, i32),
    AutoRead(bool),
    MaxMessagesPerRead(u32),
    Allocator(AllocatorOption),
    RecvAllocator(RecvAllocatorOption),
}

/// Selects an option to read back without needing a value to set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOptionKind {
    Socket(SocketOptionName),
    AutoRead,
    MaxMessagesPerRead,
}

/// Returned by `Channel::get_option`.
///
/// `AllocatorOption`/`RecvAllocatorOption` have no corresponding
/// `ChannelOptionKind`/`ChannelOptionValue` variant: they swap a `Box<dyn
/// Trait>` strategy, and there is nothing meaningful to copy back out of
/// a trait object for a caller to compare — the same reason they live in
/// their own newtypes instead of `ChannelOptionValue`'s otherwise `Copy`
/// payloads. `Socket`/`AutoRead`/`MaxMessagesPerRead` round-trip through
/// `get_option` because their values are plain, comparable scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOptionValue {
    Socket(i32),
    AutoRead(bool),
    MaxMessagesPerRead(u32),
}

/// Swaps the allocator a channel uses for convenience writes (see
/// `Channel::write_slice`) — spec §4.6's `AllocatorOption` category,
/// kept distinct from [`RecvAllocatorOption`] exactly as the spec lists
/// them as separate option categories.
///
/// Kept out of [`ChannelOption`]'s other variants' shape because it moves
/// a `Box<dyn BufferAllocator>` rather than a plain value; wrapping it in
/// its own newtype lets `Channel` expose a dedicated setter alongside the
/// `ChannelOption::Allocator` path without cramming a trait object into
/// the option enum's otherwise `Copy` payloads.
pub struct AllocatorOption(pub Box<dyn BufferAllocator>);

/// Swaps the allocator a channel uses to size its next receive buffer —
/// spec §4.6's `RecvAllocatorOption` category.
pub struct RecvAllocatorOption(pub Box<dyn RecvBufferAllocator>);
