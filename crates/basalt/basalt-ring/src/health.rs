//! Read-only health projection of a ring.
//!
//! Computed on demand from the ring's atomic state; safe to call from
//! any attached process at any time.

use crate::clock;
use basalt_region::{Region, RingKind, SlotHeader};
use serde::Serialize;
use std::sync::atomic::Ordering;

/// Snapshot of one ring's publish-side state.
#[derive(Debug, Clone, Serialize)]
pub struct RingHealth {
    pub topic: String,
    pub kind: RingKind,
    /// Write head at capture time = total committed messages.
    pub total_published: u64,
    /// Commit timestamp of the newest slot, or 0 while its writer is
    /// still in flight (the slot's sequence does not yet match the head).
    pub last_publish_ns: u64,
    /// Monotonic nanoseconds when this snapshot was taken.
    pub captured_at_ns: u64,
}

impl RingHealth {
    /// Captures a snapshot, or `None` if the topic does not exist (or
    /// carries an unknown ring kind tag).
    pub fn capture(region: &Region, topic: &str) -> Option<RingHealth> {
        let entry = region.lookup(topic)?;
        let kind = entry.ring_kind()?;
        let desc = region.ring_desc(entry);

        let head = desc.w_head.load(Ordering::Acquire);
        let mut last_publish_ns = 0;
        if head > 0 {
            let idx = (head - 1) & desc.mask();
            // SAFETY: idx is masked; the slot array offsets were
            // bounds-checked at init.
            let hdr = unsafe {
                region
                    .base()
                    .add(desc.base_offset as usize + (idx * desc.slot_size as u64) as usize)
            } as *const SlotHeader;

            let seq = unsafe { &(*hdr).seq }.load(Ordering::Acquire);
            if seq == head {
                last_publish_ns = unsafe { (*hdr).timestamp_ns };
            }
        }

        Some(RingHealth {
            topic: topic.to_string(),
            kind,
            total_published: head,
            last_publish_ns,
            captured_at_ns: clock::now_ns(),
        })
    }

    /// Slots between the head and a subscriber cursor.
    #[inline]
    pub fn lag_of(&self, last_seq: u64) -> u64 {
        self.total_published.saturating_sub(last_seq)
    }

    /// True when a subscriber at `last_seq` trails by more than
    /// `threshold_slots`.
    #[inline]
    pub fn is_lagging(&self, last_seq: u64, threshold_slots: u64) -> bool {
        self.lag_of(last_seq) > threshold_slots
    }

    /// True when nothing has been committed for longer than
    /// `timeout_ns` as of `now_ns`.
    #[inline]
    pub fn is_stalled(&self, now_ns: u64, timeout_ns: u64) -> bool {
        now_ns.saturating_sub(self.last_publish_ns) > timeout_ns
    }
}
