/*!
 * Signal Delivery State
 * Lock-free delivery counter shared between the raw handler and the main flow
 */

use super::types::SignalStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// Delivery counter with an immutable threshold
///
/// # Signal safety
/// `record_delivery` is a bounded compare-and-swap loop on a single atomic:
/// no allocation, no locks, safe to call from a raw signal handler.
///
/// # Performance
/// - Cache-line aligned so the handler's writes do not false-share with neighbours
#[repr(C, align(64))]
#[derive(Debug)]
pub struct SignalState {
    count: AtomicU64,
    threshold: u64,
}

impl SignalState {
    /// Threshold must be non-zero; callers validate before construction
    #[inline]
    pub fn new(threshold: u64) -> Self {
        debug_assert!(threshold > 0);
        Self {
            count: AtomicU64::new(0),
            threshold,
        }
    }

    /// Record one delivery
    ///
    /// Returns the new count, or `None` once the threshold was already
    /// reached. After that point the count never changes again.
    #[inline(always)]
    pub fn record_delivery(&self) -> Option<u64> {
        let threshold = self.threshold;
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < threshold).then_some(current + 1)
            })
            .ok()
            .map(|previous| previous + 1)
    }

    /// Current delivery count
    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Threshold reached; the owning process is terminating
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.count() >= self.threshold
    }

    pub fn snapshot(&self) -> SignalStats {
        let count = self.count();
        SignalStats {
            count,
            threshold: self.threshold,
            exhausted: count >= self.threshold,
        }
    }
}
