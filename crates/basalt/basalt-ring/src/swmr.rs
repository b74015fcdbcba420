//! Single-writer/multi-reader publisher.
//!
//! Publish is wait-free: one atomic fetch-add reserves the sequence,
//! then a bounded series of stores fills and commits the slot. Nothing
//! in this path can block on readers or on the ring.

use crate::ring::{AttachError, PublishError, RingRef, prefetch};
use basalt_region::{Region, SLOT_HEADER_LEN};
use std::sync::Arc;

pub struct SwmrPublisher {
    ring: RingRef,
    pub_id: u16,
}

impl SwmrPublisher {
    /// Attaches a publisher to a topic in an already-mapped region.
    ///
    /// The discipline expects one producer per topic, but attach does
    /// not enforce it: reservation is atomic, so an accidental second
    /// writer degrades to multi-writer behavior and readers stay safe
    /// through the torn-read recheck.
    pub fn attach(region: Arc<Region>, topic: &str, pub_id: u16) -> Result<Self, AttachError> {
        let (ring, _kind) = RingRef::attach(region, topic)?;
        Ok(Self { ring, pub_id })
    }

    /// Publishes one message. Returns the commit sequence (the first
    /// message on a ring commits as sequence 1).
    #[inline]
    pub fn publish(&mut self, payload: &[u8]) -> Result<u64, PublishError> {
        if payload.len() > self.ring.max_payload() {
            return Err(PublishError::TooLarge {
                len: payload.len(),
                max: self.ring.max_payload(),
            });
        }

        let commit_seq = self.ring.reserve();
        let slot = self.ring.slot_ptr((commit_seq - 1) & self.ring.mask());
        // Warm the payload bytes we are about to overwrite.
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
