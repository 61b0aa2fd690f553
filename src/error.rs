use std::io;

/// Errors surfaced to pipeline handlers and write/close completions.
///
/// Invariant-violation "programmer errors" (spec §7's fourth error kind —
/// a vectored write reporting more bytes accepted than were offered) are
/// deliberately *not* a variant here: those are `debug_assert!`-style
/// checks (see [`crate::macros::safe_assert`]), not recoverable values a
/// handler reacts to. An unknown `ChannelOption` — the other programmer
/// error spec §7 names — can't arise at all: `ChannelOption`/
/// `ChannelOptionKind` are closed enums, so there is no runtime lookup
/// that could fail to recognize an option (see options.rs).
#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Synthetic error used to fail pending writes on close and to reject
    /// `write0` on a channel that is no longer open.
    #[error("channel closed")]
    Closed,

    /// `write0` was handed a payload that isn't a supported byte buffer.
    #[error("unsupported message type")]
    UnsupportedMessage,
}

impl ChannelError {
    pub(crate) fn is_would_block(err: &io::Error) -> bool {
        err.kind() == io::ErrorKind::WouldBlock
    }
}

/// One-shot completion for a single pending write.
///
/// A minimal promise substitute: the queue calls this exactly once, with
/// `Ok(())` on a fully drained write or `Err(&err)` if the channel
/// closed (or the write failed) before the bytes were sent.
pub type WriteCompletion = Box<dyn FnOnce(Result<(), &ChannelError>) + Send>;

