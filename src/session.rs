//! Interactive search plumbing: input debouncing and response sequencing.
//!
//! Searches may complete out of order (a semantic query can take seconds while
//! a later substring query returns at once). Every search is issued a
//! [`Ticket`]; a response is applied only if no newer search has been issued
//! or accepted since.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
struct Marks {
    issued: u64,
    accepted: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SearchSequencer {
    marks: Arc<Mutex<Marks>>,
}

impl SearchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        let mut m = self.marks.lock().unwrap();
        m.issued += 1;
        Ticket(m.issued)
    }

    /// Claims the result slot for `ticket`. False means the response is stale
    /// and must be dropped.
    pub fn accept(&self, ticket: Ticket) -> bool {
        let mut m = self.marks.lock().unwrap();
        if ticket.0 < m.issued || ticket.0 <= m.accepted {
            debug!(seq = ticket.0, issued = m.issued, accepted = m.accepted, "discarding stale search response");
            return false;
        }
        m.accepted = ticket.0;
        true
    }

    pub fn latest(&self) -> Ticket {
        Ticket(self.marks.lock().unwrap().issued)
    }
}

/// Handle for one input event, redeemed with [`Debouncer::settled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending(u64);

/// Only the last input within the quiet window fires.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, generation: Arc::new(AtomicU64::new(0)) }
    }

    /// Records an input event; every earlier pending input is superseded.
    pub fn input(&self) -> Pending {
        Pending(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Waits out the window. True if no newer input arrived meanwhile.
    pub async fn settled(&self, pending: Pending) -> bool {
        tokio::time::sleep(self.window).await;
        self.generation.load(Ordering::SeqCst) == pending.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_response_for_an_older_search_is_discarded() {
        let seq = SearchSequencer::new();
        let slow = seq.issue();
        let fast = seq.issue();
        assert!(seq.accept(fast));
        assert!(!seq.accept(slow));
        assert_eq!(seq.latest(), fast);
    }

    #[test]
    fn response_is_stale_once_a_newer_search_is_issued() {
        let seq = SearchSequencer::new();
        let first = seq.issue();
        let _second = seq.issue();
        assert!(!seq.accept(first));
    }

    #[test]
    fn a_ticket_is_accepted_once() {
        let seq = SearchSequencer::new();
        let t = seq.issue();
        assert!(seq.accept(t));
        assert!(!seq.accept(t));
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_last_input_in_the_window_fires() {
        let d = Debouncer::new(Duration::from_millis(300));
        let first = d.input();
        let early = tokio::spawn({
            let d = d.clone();
            async move { d.settled(first).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = d.input();
        assert!(!early.await.unwrap());
        assert!(d.settled(second).await);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_inputs_each_fire() {
        let d = Debouncer::new(Duration::from_millis(300));
        let a = d.input();
        assert!(d.settled(a).await);
        let b = d.input();
        assert!(d.settled(b).await);
    }
}
