// Result slot - Reconciles out-of-order dispatch completions
use crate::application::dispatcher::ProcessedSeries;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Holds the processed series the render path paints.
///
/// Completions are applied in the order they arrive, except that a result is
/// discarded once a result from a later-issued request has been applied.
#[derive(Default)]
pub struct ResultSlot {
    next_ticket: AtomicU64,
    applied: Mutex<Option<(u64, Arc<ProcessedSeries>)>>,
}

impl ResultSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket for a new request; tickets increase with issuance order.
    pub fn issue(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Applies a completion. Returns false when it was stale.
    pub fn complete(&self, ticket: u64, result: ProcessedSeries) -> bool {
        let mut applied = self.applied.lock();
        if let Some((current, _)) = applied.as_ref() {
            if *current > ticket {
                tracing::debug!("Discarding stale result #{} (showing #{})", ticket, current);
                return false;
            }
        }
        *applied = Some((ticket, Arc::new(result)));
        true
    }

    pub fn latest(&self) -> Option<Arc<ProcessedSeries>> {
        self.applied.lock().as_ref().map(|(_, result)| result.clone())
    }

    /// Latest result, or `fill()` stored under ticket 0 when nothing has been
    /// applied yet. Any issued ticket supersedes the filled result.
    pub fn latest_or_fill(&self, fill: impl FnOnce() -> ProcessedSeries) -> Arc<ProcessedSeries> {
        if let Some(result) = self.latest() {
            return result;
        }
        let filled = Arc::new(fill());
        let mut applied = self.applied.lock();
        match applied.as_ref() {
            Some((_, current)) => current.clone(),
            None => {
                *applied = Some((0, filled.clone()));
                filled
            }
        }
    }

    pub fn applied_ticket(&self) -> Option<u64> {
        self.applied.lock().as_ref().map(|(ticket, _)| *ticket)
    }
}
