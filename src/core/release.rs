//! Fence-based deferred release.
//!
//! Backends must not destroy an object that command lists still in flight may
//! reference. [`DeferredReleaseQueue`] holds each released item until every
//! command queue named in its mask has completed the submission that followed
//! the release.
//!
//! ```rust,ignore
//! let queue = DeferredReleaseQueue::new();
//! queue.safe_release(framebuffer, 0b01);
//! let fence = queue.submit(0)?;           // submission that may still use it
//! queue.purge(|_| fence - 1);             // not yet complete: kept
//! queue.purge(|_| fence);                 // complete: dropped
//! ```

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::errors::{GraphicsError, Result};

const MAX_QUEUES: usize = u64::BITS as usize;

struct Stamped<T> {
    item: T,
    /// `(queue index, fence value)` that must be reached before release.
    fences: SmallVec<[(u8, u64); 2]>,
}

struct Inner<T> {
    /// Last submitted fence value per queue.
    submitted: [u64; MAX_QUEUES],
    pending: Vec<Stamped<T>>,
}

/// Holds released objects until the GPU timelines that may use them drain.
pub struct DeferredReleaseQueue<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> Default for DeferredReleaseQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DeferredReleaseQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                submitted: [0; MAX_QUEUES],
                pending: Vec::new(),
            }),
        }
    }

    /// Queues `item` for release once every queue in `queue_mask` has completed
    /// its next submission.
    ///
    /// With an empty mask the item is released by the next [`purge`](Self::purge).
    pub fn safe_release(&self, item: T, queue_mask: u64) {
        let mut inner = self.inner.lock();
        let fences = (0..MAX_QUEUES)
            .filter(|q| queue_mask & (1u64 << q) != 0)
            .map(|q| (q as u8, inner.submitted[q] + 1))
            .collect();
        inner.pending.push(Stamped { item, fences });
    }

    /// Records a submission on `queue` and returns its fence value.
    ///
    /// Queue masks are 64 bits wide, so queues past 63 are rejected.
    pub fn submit(&self, queue: u8) -> Result<u64> {
        let mut inner = self.inner.lock();
        let slot = inner
            .submitted
            .get_mut(usize::from(queue))
            .ok_or_else(|| {
                GraphicsError::InvalidDescription(format!(
                    "command queue {queue} is out of range (at most {MAX_QUEUES} queues)"
                ))
            })?;
        *slot += 1;
        Ok(*slot)
    }

    /// Drops every item whose fences have all completed.
    ///
    /// `completed(queue)` returns the last fence value the GPU has signalled on
    /// that queue. Returns the number of items released.
    pub fn purge(&self, completed: impl Fn(u8) -> u64) -> usize {
        let released: Vec<T> = {
            let mut inner = self.inner.lock();
            let (done, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut inner.pending)
                .into_iter()
                .partition(|s| s.fences.iter().all(|&(q, fence)| completed(q) >= fence));
            inner.pending = keep;
            done.into_iter().map(|s| s.item).collect()
        };
        // Items drop outside the lock.
        let count = released.len();
        drop(released);
        if count > 0 {
            log::debug!("Deferred release: dropped {count} object(s)");
        }
        count
    }

    /// Number of items still waiting for their fences.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.lock().pending.len()
    }
}
