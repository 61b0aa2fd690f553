//! A readiness-driven, non-blocking byte-stream channel built on [`mio`].
//!
//! [`channel::Channel`] owns one connected socket, a [`queue::PendingWriteQueue`]
//! of buffered writes, and an [`interest::InterestStateMachine`] that keeps
//! the event loop's registration in sync with what the channel actually
//! wants notification for. [`listener::Listener`] accepts inbound
//! connections into the same shape.

pub mod alloc;
pub mod channel;
pub mod error;
pub mod handler;
mod interest;
pub mod listener;
mod macros;
pub mod options;
mod queue;
pub mod socket;

pub use channel::Channel;
pub use error::{ChannelError, WriteCompletion};
pub use handler::{ChannelContext, ChannelHandler, NoopHandler};
pub use listener::Listener;
pub use options::{AllocatorOption, ChannelOption, ChannelOptionKind, ChannelOptionValue, RecvAllocatorOption};
pub use socket::{Socket, SocketOptionName};
