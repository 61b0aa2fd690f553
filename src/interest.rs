use mio::Interest;

/// The set of I/O edges a [`crate::channel::Channel`] currently wants
/// notification for. The channel is registered with the event loop iff
/// this is not `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InterestedEvent {
    None,
    Read,
    Write,
    Both,
}

impl InterestedEvent {
    fn bits(self) -> (bool, bool) {
        match self {
            InterestedEvent::None => (false, false),
            InterestedEvent::Read => (true, false),
            InterestedEvent::Write => (false, true),
            InterestedEvent::Both => (true, true),
        }
    }

    fn from_bits(read: bool, write: bool) -> Self {
        match (read, write) {
            (false, false) => InterestedEvent::None,
            (true, false) => InterestedEvent::Read,
            (false, true) => InterestedEvent::Write,
            (true, true) => InterestedEvent::Both,
        }
    }

    fn to_mio(self) -> Option<Interest> {
        match self {
            InterestedEvent::None => None,
            InterestedEvent::Read => Some(Interest::READABLE),
            InterestedEvent::Write => Some(Interest::WRITABLE),
            InterestedEvent::Both => Some(Interest::READABLE | Interest::WRITABLE),
        }
    }
}

/// What the event loop must be told after a transition.
///
/// `mio::Interest` has no empty/"none" value, so any transition whose
/// *target* is `None` is a `Deregister` rather than a `Reregister` with an
/// empty set, and any transition whose *source* is `None` (nothing
/// currently registered) is a `Register` rather than a `Reregister` of a
/// non-existent registration — the literal spec table labels a few of
/// these `reregister`, but that call is unrepresentable against mio's
/// actual API, so this resolves that ambiguity toward what mio can do
/// (recorded in DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InterestAction {
    Noop,
    Register(Interest),
    Reregister(Interest),
    Deregister,
}

/// Tracks the current [`InterestedEvent`] and computes the register/
/// reregister/deregister action for a requested change. Performing the
/// actual mio call is the channel's job — this type stays pure so the
/// transition table is directly testable.
#[derive(Debug, Default)]
pub(crate) struct InterestStateMachine {
    current: InterestedEvent,
}

impl Default for InterestedEvent {
    fn default() -> Self {
        InterestedEvent::None
    }
}

impl InterestStateMachine {
    pub(crate) fn current(&self) -> InterestedEvent {
        self.current
    }

    pub(crate) fn is_registered(&self) -> bool {
        self.current != InterestedEvent::None
    }

    /// Additively toggles the read bit, leaving the write bit untouched.
    pub(crate) fn set_read(&mut self, want_read: bool) -> InterestAction {
        let (read, write) = self.current.bits();
        if read == want_read {
            return InterestAction::Noop;
        }
        self.transition(want_read, write)
    }

    /// Additively toggles the write bit, leaving the read bit untouched.
    pub(crate) fn set_write(&mut self, want_write: bool) -> InterestAction {
        let (read, write) = self.current.bits();
        if write == want_write {
            return InterestAction::Noop;
        }
        self.transition(read, want_write)
    }

    /// Forces the state to `None` without emitting a deregister action —
    /// used when the channel is no longer open and must not issue any
    /// further loop calls (spec §4.2: "a channel that is not open
    /// silently forces interest to None").
    pub(crate) fn force_none(&mut self) {
        self.current = InterestedEvent::None;
    }

    fn transition(&mut self, read: bool, write: bool) -> InterestAction {
        let was_registered = self.is_registered();
        let target = InterestedEvent::from_bits(read, write);
        self.current = target;
        match target.to_mio() {
            None => InterestAction::Deregister,
            Some(interest) if !was_registered => InterestAction::Register(interest),
            Some(interest) => InterestAction::Reregister(interest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_on_first_read_interest() {
        let mut m = InterestStateMachine::default();
        assert_eq!(m.set_read(true), InterestAction::Register(Interest::READABLE));
        assert_eq!(m.current(), InterestedEvent::Read);
    }

    #[test]
    fn adding_write_while_read_armed_yields_both_additively() {
        let mut m = InterestStateMachine::default();
        m.set_read(true);
        assert_eq!(
            m.set_write(true),
            InterestAction::Reregister(Interest::READABLE | Interest::WRITABLE)
        );
        assert_eq!(m.current(), InterestedEvent::Both);
    }

    #[test]
    fn adding_read_while_write_armed_yields_both_additively() {
        let mut m = InterestStateMachine::default();
        m.set_write(true);
        assert_eq!(
            m.set_read(true),
            InterestAction::Reregister(Interest::READABLE | Interest::WRITABLE)
        );
        assert_eq!(m.current(), InterestedEvent::Both);
    }

    #[test]
    fn withdrawing_one_bit_from_both_leaves_the_other() {
        let mut m = InterestStateMachine::default();
        m.set_read(true);
        m.set_write(true);
        assert_eq!(m.set_write(false), InterestAction::Reregister(Interest::READABLE));
        assert_eq!(m.current(), InterestedEvent::Read);
    }

    #[test]
    fn withdrawing_last_bit_deregisters() {
        let mut m = InterestStateMachine::default();
        m.set_read(true);
        assert_eq!(m.set_read(false), InterestAction::Deregister);
        assert_eq!(m.current(), InterestedEvent::None);
        assert!(!m.is_registered());
    }

    #[test]
    fn no_op_when_bit_already_set() {
        let mut m = InterestStateMachine::default();
        m.set_read(true);
        assert_eq!(m.set_read(true), InterestAction::Noop);
    }

    #[test]
    fn force_none_is_silent() {
        let mut m = InterestStateMachine::default();
        m.set_read(true);
        m.force_none();
        assert_eq!(m.current(), InterestedEvent::None);
    }
}
