//! Cooperative cancellation and overload signaling (§5's "Back-pressure").
//!
//! Constructing a run's cancellation channel and enforcing a concurrency
//! cap are the outer host's job, not this crate's — `planner-core` only
//! exposes the vocabulary an orchestrator checks against.

/// A cooperative cancellation signal, checked at the top of every control
/// loop iteration.
///
/// Cloning shares the same underlying channel: every clone observes the
/// same cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal(tokio::sync::watch::Receiver<bool>);

impl CancelSignal {
    /// Wrap a `watch::Receiver<bool>` as a `CancelSignal`.
    pub fn new(receiver: tokio::sync::watch::Receiver<bool>) -> Self {
        Self(receiver)
    }

    /// A signal that is never cancelled, for runs with no host-level
    /// cancellation wiring.
    pub fn never() -> Self {
        let (_tx, rx) = tokio::sync::watch::channel(false);
        Self(rx)
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

/// How the host should behave when it is already at its concurrent-run cap
/// (§5 "Back-pressure").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverloadPolicy {
    /// Hold the new run until capacity frees up.
    Queue,
    /// Refuse the new run immediately with `error_code = "overloaded"`.
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_is_never_cancelled() {
        assert!(!CancelSignal::never().is_cancelled());
    }

    #[test]
    fn signal_reflects_sender() {
        let (tx, rx) = tokio::sync::watch::channel(false);
        let signal = CancelSignal::new(rx);
        assert!(!signal.is_cancelled());
        tx.send(true).unwrap();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn clones_observe_the_same_channel() {
        let (tx, rx) = tokio::sync::watch::channel(false);
        let a = CancelSignal::new(rx);
        let b = a.clone();
        tx.send(true).unwrap();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
    }
}
