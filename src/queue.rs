use std::{collections::VecDeque, io::IoSlice};

use bytes::Buf;

use crate::{
    error::{ChannelError, WriteCompletion},
    macros::safe_assert,
};

/// One buffered write: a cursor-bearing buffer plus its completion.
///
/// The spec models this as a linked node with an explicit `next` pointer;
/// [`PendingWriteQueue`] realizes the same FIFO with a `VecDeque` instead
/// (the same choice the teacher crate makes for its own send backlog),
/// so there is no separate `next` field here — queue order *is* the link.
struct PendingWrite {
    buffer: Box<dyn Buf + Send>,
    completion: WriteCompletion,
}

/// One write attempt offered to the caller's I/O callback: either the
/// single head buffer, or a gathering-write view over up to
/// `writev_limit` buffers walked from the head.
///
/// Modeled as one enum (rather than two separate `single`/`vector`
/// callbacks) so `consume` only ever needs a single `FnMut` borrow of
/// the caller's socket alive at a time — two simultaneously-live
/// closures each wanting `&mut` access to the same socket would not
/// borrow-check.
pub(crate) enum WriteAttempt<'a> {
    Single(&'a [u8]),
    Vector(&'a [IoSlice<'a>]),
}

/// FIFO of writes a [`crate::channel::Channel`] hasn't finished sending.
///
/// Invariants (see spec §4.1 / §8):
/// - `is_empty() == (outstanding == 0)`.
/// - `outstanding` is always the sum of `remaining()` across live nodes.
/// - a node is popped from the queue *before* its completion runs, so a
///   completion that calls back into `write0`/`flush0` observes a queue
///   that no longer contains the node it was just called for.
pub(crate) struct PendingWriteQueue {
    nodes: VecDeque<PendingWrite>,
    outstanding: usize,
}

impl PendingWriteQueue {
    pub(crate) fn new() -> Self {
        Self { nodes: VecDeque::new(), outstanding: 0 }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub(crate) fn enqueue(&mut self, buffer: Box<dyn Buf + Send>, completion: WriteCompletion) {
        self.outstanding += buffer.remaining();
        self.nodes.push_back(PendingWrite { buffer, completion });
    }

    /// The central drain primitive. `io` has already resolved the
    /// underlying syscall to `Some(n)` (n bytes accepted, possibly 0) or
    /// `None` (would-block); a hard I/O error is the caller's concern —
    /// it must stash it out-of-band and return `None`, then bail out of
    /// its own flush loop before calling `consume` again.
    ///
    /// `writev_limit` bounds how many nodes are offered as a
    /// [`WriteAttempt::Vector`] in one call (the platform's `IOV_MAX`,
    /// conventionally 1024).
    ///
    /// Returns `None` if the queue was already empty, `Some(true)` if a
    /// full batch drained (the queue may have more work), `Some(false)`
    /// if the write was partial or would-block.
    pub(crate) fn consume<F>(&mut self, writev_limit: usize, mut io: F) -> Option<bool>
    where
        F: FnMut(WriteAttempt<'_>) -> Option<usize>,
    {
        if self.nodes.is_empty() {
            return None;
        }

        let node_count = self.nodes.len().min(writev_limit.max(1));
        let offered: usize = self.nodes.iter().take(node_count).map(|n| n.buffer.remaining()).sum();

        let accepted = if node_count == 1 {
            io(WriteAttempt::Single(self.nodes[0].buffer.chunk()))
        } else {
            let mut iov = Vec::with_capacity(node_count);
            for node in self.nodes.iter().take(node_count) {
                iov.push(IoSlice::new(node.buffer.chunk()));
            }
            io(WriteAttempt::Vector(&iov))
        };

        let Some(accepted) = accepted else {
            // would-block: a perfect no-op, no cursor touched.
            return Some(false);
        };

        safe_assert!(
            accepted <= offered,
            "write callback reported {accepted} bytes accepted but only {offered} were offered"
        );
        let accepted = accepted.min(offered);

        self.outstanding -= accepted;
        let mut remaining = accepted;
        while remaining > 0 {
            let Some(front_len) = self.nodes.front().map(|n| n.buffer.remaining()) else {
                break;
            };
            if remaining >= front_len {
                remaining -= front_len;
                let node = self.nodes.pop_front().expect("front just checked non-empty");
                (node.completion)(Ok(()));
            } else {
                self.nodes.front_mut().expect("front just checked non-empty").buffer.advance(remaining);
                remaining = 0;
            }
        }

        Some(accepted == offered)
    }

    /// Unlinks and fails every pending write with `err`, in FIFO order.
    /// Postcondition: the queue is empty and `outstanding == 0`.
    pub(crate) fn fail_all(&mut self, err: &ChannelError) {
        while let Some(node) = self.nodes.pop_front() {
            self.outstanding -= node.buffer.remaining();
            (node.completion)(Err(err));
        }
    }
}

impl Default for PendingWriteQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    fn completion(log: Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> WriteCompletion {
        Box::new(move |res| {
            log.borrow_mut().push(if res.is_ok() { tag } else { "failed" });
        })
    }

    fn as_single(attempt: WriteAttempt<'_>) -> &[u8] {
        match attempt {
            WriteAttempt::Single(buf) => buf,
            WriteAttempt::Vector(_) => panic!("expected single path"),
        }
    }

    fn as_vector<'a>(attempt: WriteAttempt<'a>) -> &'a [IoSlice<'a>] {
        match attempt {
            WriteAttempt::Vector(bufs) => bufs,
            WriteAttempt::Single(_) => panic!("expected vector path"),
        }
    }

    #[test]
    fn empty_queue_consume_returns_none() {
        let mut q = PendingWriteQueue::new();
        assert_eq!(q.consume(1024, |_| None), None);
    }

    #[test]
    fn scenario_single_full_vector_drain() {
        // Enqueue [b"ABC", b"DEFGH"]; a vector write accepting all 8 bytes
        // drains both buffers in one call and reports `Some(true)`.
        let mut q = PendingWriteQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        q.enqueue(Box::new(bytes::Bytes::from_static(b"ABC")), completion(log.clone(), "first"));
        q.enqueue(Box::new(bytes::Bytes::from_static(b"DEFGH")), completion(log.clone(), "second"));
        assert_eq!(q.outstanding(), 8);

        let got = q.consume(1024, |attempt| {
            assert_eq!(as_vector(attempt).len(), 2);
            Some(8)
        });
        assert_eq!(got, Some(true));
        assert!(q.is_empty());
        assert_eq!(q.outstanding(), 0);
        assert_eq!(*log.borrow(), vec!["first", "second"]);

        assert_eq!(q.consume(1024, |_| None), None);
    }

    #[test]
    fn scenario_single_buffer_partial_write() {
        let mut q = PendingWriteQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        q.enqueue(Box::new(bytes::Bytes::from_static(b"ABCDE")), completion(log.clone(), "only"));

        let got = q.consume(1024, |attempt| {
            assert_eq!(as_single(attempt), b"ABCDE");
            Some(2)
        });

        assert_eq!(got, Some(false));
        assert!(log.borrow().is_empty());
        assert_eq!(q.outstanding(), 3);

        let got = q.consume(1024, |attempt| {
            assert_eq!(as_single(attempt), b"CDE");
            None
        });
        assert_eq!(got, Some(false));
        assert_eq!(q.outstanding(), 3);
    }

    #[test]
    fn scenario_two_buffers_partial_vector_write() {
        let mut q = PendingWriteQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        q.enqueue(Box::new(bytes::Bytes::from_static(b"AB")), completion(log.clone(), "first"));
        q.enqueue(Box::new(bytes::Bytes::from_static(b"CD")), completion(log.clone(), "second"));

        let got = q.consume(1024, |attempt| {
            assert_eq!(as_vector(attempt).len(), 2);
            Some(3)
        });

        assert_eq!(got, Some(false));
        assert_eq!(*log.borrow(), vec!["first"]);
        assert_eq!(q.outstanding(), 1);

        let got = q.consume(1024, |attempt| {
            assert_eq!(as_single(attempt), b"D");
            Some(1)
        });
        assert_eq!(got, Some(true));
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn zero_byte_accept_is_partial_and_noop() {
        let mut q = PendingWriteQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        q.enqueue(Box::new(bytes::Bytes::from_static(b"X")), completion(log.clone(), "only"));

        let got = q.consume(1024, |_| Some(0));
        assert_eq!(got, Some(false));
        assert!(log.borrow().is_empty());
        assert_eq!(q.outstanding(), 1);
    }

    #[test]
    fn writev_limit_caps_offered_nodes() {
        let mut q = PendingWriteQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..5 {
            q.enqueue(Box::new(bytes::Bytes::from_static(b"A")), completion(log.clone(), "x"));
            let _ = i;
        }

        let got = q.consume(2, |attempt| {
            assert_eq!(as_vector(attempt).len(), 2);
            Some(2)
        });
        assert_eq!(got, Some(true));
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(q.outstanding(), 3);
    }

    #[test]
    fn fail_all_drains_and_fails_in_order() {
        let mut q = PendingWriteQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        q.enqueue(Box::new(bytes::Bytes::from_static(b"A")), completion(log.clone(), "first"));
        q.enqueue(Box::new(bytes::Bytes::from_static(b"B")), completion(log.clone(), "second"));

        q.fail_all(&ChannelError::Closed);

        assert!(q.is_empty());
        assert_eq!(q.outstanding(), 0);
        assert_eq!(*log.borrow(), vec!["failed", "failed"]);
    }

    #[test]
    fn reentrant_enqueue_during_completion_is_observed_on_next_consume() {
        // A completion that enqueues again must see a queue that's already
        // forgotten the node it was called for.
        let mut q = PendingWriteQueue::new();
        let reentered = Rc::new(RefCell::new(false));
        let reentered2 = reentered.clone();

        let first: WriteCompletion = Box::new(move |_res| {
            *reentered2.borrow_mut() = true;
        });
        q.enqueue(Box::new(bytes::Bytes::from_static(b"A")), first);

        let got = q.consume(1024, |_| Some(1));
        assert_eq!(got, Some(true));
        assert!(*reentered.borrow());
        assert!(q.is_empty());
    }
}
