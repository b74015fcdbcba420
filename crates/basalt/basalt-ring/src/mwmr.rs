//! Multi-writer/multi-reader publisher.
//!
//! Writers must not corrupt one another's slots, and a writer whose
//! reserved slot still holds a newer committed message (the head lapped
//! while readers and writers were slow) must wait rather than overwrite.
//!
//! The slot's sequence counter doubles as a generation tag: dividing by
//! `slot_count` yields the pass over the ring that wrote it. A writer
//! holding `commit_seq` only needs its own slot's previous generation to
//! publish, and each slot has at most one live writer per generation, so
//! the wait is bounded.

use crate::ring::{AttachError, PublishError, RingRef, prefetch};
use basalt_region::{Region, RingKind, SLOT_HEADER_LEN};
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// Spin with a CPU-relax hint this many times before yielding the core.
const SPIN_BEFORE_YIELD: u32 = 10;

/// Wait-loop budget. Exhausting it surfaces as [`PublishError::Timeout`];
/// callers decide whether to retry or drop.
const MAX_WAIT_ITERS: u32 = 100_000;

pub struct MwmrPublisher {
    ring: RingRef,
    pub_id: u16,
}

impl MwmrPublisher {
    /// Attaches a publisher to an MWMR topic. A SWMR topic is rejected:
    /// its readers assume a single writer's ordering.
    pub fn attach(region: Arc<Region>, topic: &str, pub_id: u16) -> Result<Self, AttachError> {
        let (ring, kind) = RingRef::attach(region, topic)?;
        if kind != RingKind::Mwmr {
            return Err(AttachError::WrongKind {
                topic: topic.to_string(),
                expected: RingKind::Mwmr.as_str(),
                found: kind.as_str(),
            });
        }
        Ok(Self { ring, pub_id })
    }

    /// Publishes one message, waiting for the reserved slot's previous
    /// generation if a slow writer from one lap back still holds it.
    pub fn publish(&mut self, payload: &[u8]) -> Result<u64, PublishError> {
        if payload.len() > self.ring.max_payload() {
            return Err(PublishError::TooLarge {
                len: payload.len(),
                max: self.ring.max_payload(),
            });
        }

        let commit_seq = self.ring.reserve();
        let slot = self.ring.slot_ptr((commit_seq - 1) & self.ring.mask());
        let hdr = slot as *const basalt_region::SlotHeader;

        let slot_count = self.ring.slot_count();
        let my_generation = commit_seq / slot_count;

        let mut iter: u32 = 0;
        loop {
            // SAFETY: hdr points at a slot header inside the mapping.
            let current = unsafe { &(*hdr).seq }.load(Ordering::Acquire);

            // Free if never written, or last written on an earlier pass.
            if current == 0 || current / slot_count < my_generation {
                break;
            }

            backoff(iter);
            iter += 1;
            if iter > MAX_WAIT_ITERS {
                return Err(PublishError::Timeout);
            }
        }

        prefetch(unsafe { slot.add(SLOT_HEADER_LEN) } as *const u8);
        self.ring.commit_slot(slot, commit_seq, payload, self.pub_id);
        Ok(commit_seq)
    }

    /// Total messages committed to this ring so far.
    #[inline]
    pub fn head(&self) -> u64 {
        self.ring.head()
    }

    #[inline]
    pub fn pub_id(&self) -> u16 {
        self.pub_id
    }

    /// Largest payload this ring's slots accept.
    #[inline]
    pub fn max_payload(&self) -> usize {
        self.ring.max_payload()
    }
}

#[inline(always)]
fn backoff(iter: u32) {
    if iter < SPIN_BEFORE_YIELD {
        std::hint::spin_loop();
    } else {
        std::thread::yield_now();
    }
}
