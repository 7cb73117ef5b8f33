//! Run sequencing for repeated aggregations.
//!
//! Every run takes a ticket with a monotonically increasing sequence
//! number. A finished run is committed only if it is still the newest run
//! started, so a stale traversal never replaces fresher counts. [`RunSlot`]
//! keeps at most one traversal in flight.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

/// Identifies one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunTicket {
    pub sequence: u64,
}

/// Holds the most recent committed value of a refreshing computation.
#[derive(Debug)]
pub struct RefreshTracker<T> {
    next_sequence: AtomicU64,
    latest: Mutex<Option<(u64, T)>>,
}

impl<T> Default for RefreshTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RefreshTracker<T> {
    pub fn new() -> Self {
        Self {
            next_sequence: AtomicU64::new(1),
            latest: Mutex::new(None),
        }
    }

    /// Start a new run.
    pub fn begin(&self) -> RunTicket {
        RunTicket {
            sequence: self.next_sequence.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Whether a newer run has started since `ticket` was issued.
    pub fn is_superseded(&self, ticket: RunTicket) -> bool {
        self.next_sequence.load(Ordering::SeqCst) > ticket.sequence + 1
    }

    /// Store `value` unless a newer run has started or committed. Returns whether it was kept.
    pub fn commit(&self, ticket: RunTicket, value: T) -> bool {
        let mut latest = self.latest.lock().unwrap_or_else(|p| p.into_inner());

        if self.is_superseded(ticket) {
            debug!("Discarding run {} (superseded)", ticket.sequence);
            return false;
        }
        if let Some((committed, _)) = latest.as_ref() {
            if *committed >= ticket.sequence {
                debug!(
                    "Discarding run {} (run {} already committed)",
                    ticket.sequence, committed
                );
                return false;
            }
        }

        *latest = Some((ticket.sequence, value));
        true
    }

    /// Sequence number of the last committed run, if any.
    #[cfg(test)]
    pub fn committed_sequence(&self) -> Option<u64> {
        let latest = self.latest.lock().unwrap_or_else(|p| p.into_inner());
        latest.as_ref().map(|(sequence, _)| *sequence)
    }
}

impl<T: Clone> RefreshTracker<T> {
    /// The last committed value.
    pub fn latest(&self) -> Option<T> {
        let latest = self.latest.lock().unwrap_or_else(|p| p.into_inner());
        latest.as_ref().map(|(_, value)| value.clone())
    }
}

/// The single in-flight run of a refreshing computation.
///
/// A run occupies the slot until its output has been collected with
/// [`RunSlot::finished`], so a new run can never start while an older
/// result is still undelivered.
#[derive(Debug)]
pub struct RunSlot<T> {
    current: Option<(RunTicket, JoinHandle<T>)>,
}

impl<T> Default for RunSlot<T> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<T: Send + 'static> RunSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Spawn the run built by `start` unless the previous one is still going.
    ///
    /// Returns the new run's ticket, or `None` when the start was skipped.
    pub fn try_start<S, F, Fut>(&mut self, tracker: &RefreshTracker<S>, start: F) -> Option<RunTicket>
    where
        F: FnOnce(RunTicket) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        if let Some((running, _)) = self.current.as_ref() {
            debug!("Run {} still in progress, skipping", running.sequence);
            return None;
        }

        let ticket = tracker.begin();
        self.current = Some((ticket, tokio::spawn(start(ticket))));
        Some(ticket)
    }

    /// Wait for the in-flight run and free the slot.
    ///
    /// Never resolves while the slot is empty. Cancel-safe: dropping the
    /// future leaves the run in place.
    pub async fn finished(&mut self) -> (RunTicket, Result<T, JoinError>) {
        let Some((ticket, handle)) = self.current.as_mut() else {
            return std::future::pending().await;
        };
        let ticket = *ticket;
        let output = handle.await;
        self.current = None;
        (ticket, output)
    }

    /// Abandon the in-flight run, if any.
    pub fn abort(&mut self) {
        if let Some((ticket, handle)) = self.current.take() {
            debug!("Aborting run {}", ticket.sequence);
            handle.abort();
        }
    }
}
