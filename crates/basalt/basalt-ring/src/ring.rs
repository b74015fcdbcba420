//! Shared ring plumbing: topic resolution, slot addressing, and the
//! commit sequence both publisher disciplines share.

use crate::clock;
use basalt_region::{Region, RingDesc, RingKind, SLOT_HEADER_LEN, SlotHeader};
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{Ordering, fence};

#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("topic '{0}' not found in region")]
    TopicNotFound(String),

    #[error("topic '{topic}' is a {found} ring, expected {expected}")]
    WrongKind {
        topic: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("topic '{0}' carries an unrecognized ring kind tag")]
    UnknownKind(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("payload of {len} bytes exceeds ring maximum of {max}")]
    TooLarge { len: usize, max: usize },

    #[error("timed out waiting for the slot's previous generation to publish")]
    Timeout,
}

/// Resolved view of one ring inside an attached region.
///
/// Holds the `Arc<Region>` so the mapping outlives every raw pointer
/// derived from it.
pub(crate) struct RingRef {
    /// Keeps the mapping alive for the handle's lifetime.
    _region: Arc<Region>,
    desc: *const RingDesc,
    slots: *mut u8,
    mask: u64,
    slot_count: u64,
    slot_size: u64,
    max_payload: usize,
}

// SAFETY: the pointers target the region mapping, which the Arc keeps
// alive; all shared mutation goes through the atomics in RingDesc and
// SlotHeader.
unsafe impl Send for RingRef {}

impl RingRef {
    pub(crate) fn attach(
        region: Arc<Region>,
        topic: &str,
    ) -> Result<(RingRef, RingKind), AttachError> {
        let entry = region
            .lookup(topic)
            .ok_or_else(|| AttachError::TopicNotFound(topic.to_string()))?;
        let kind = entry
            .ring_kind()
            .ok_or_else(|| AttachError::UnknownKind(topic.to_string()))?;

        let desc: *const RingDesc = region.ring_desc(entry);
        // SAFETY: descriptor offsets were bounds-checked at init.
        let (slot_count, slot_size, base_offset) = unsafe {
            (
                (*desc).slot_count as u64,
                (*desc).slot_size as u64,
                (*desc).base_offset as usize,
            )
        };
        let slots = unsafe { region.base().add(base_offset) };

        Ok((
            RingRef {
                _region: region,
                desc,
                slots,
                mask: slot_count - 1,
                slot_count,
                slot_size,
                max_payload: slot_size as usize - SLOT_HEADER_LEN,
            },
            kind,
        ))
    }

    #[inline(always)]
    pub(crate) fn desc(&self) -> &RingDesc {
        // SAFETY: points into the live mapping, immutable except w_head.
        unsafe { &*self.desc }
    }

    /// Acquire-load of the ring's write head.
    #[inline(always)]
    pub(crate) fn head(&self) -> u64 {
        self.desc().w_head.load(Ordering::Acquire)
    }

    /// Reserves the next sequence number. The returned value is this
    /// message's commit sequence; the slot it maps to is
    /// `(seq - 1) & mask`.
    #[inline(always)]
    pub(crate) fn reserve(&self) -> u64 {
        self.desc().w_head.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[inline(always)]
    pub(crate) fn slot_ptr(&self, idx: u64) -> *mut u8 {
        // SAFETY: callers mask idx, so the offset stays inside the array.
        unsafe { self.slots.add((idx * self.slot_size) as usize) }
    }

    #[inline(always)]
    pub(crate) fn mask(&self) -> u64 {
        self.mask
    }

    #[inline(always)]
    pub(crate) fn slot_count(&self) -> u64 {
        self.slot_count
    }

    #[inline(always)]
    pub(crate) fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Writes payload and header fields into `slot`, then commits by
    /// release-storing `commit_seq` into the slot's sequence counter.
    /// The release fence orders every payload/header store before the
    /// commit store.
    #[inline(always)]
    pub(crate) fn commit_slot(&self, slot: *mut u8, commit_seq: u64, payload: &[u8], pub_id: u16) {
        let hdr = slot as *mut SlotHeader;
        // SAFETY: slot is one full slot inside the mapping and the
        // caller verified `payload.len() <= max_payload`. Readers racing
        // with these plain stores discard the frame via the seqlock
        // recheck.
        unsafe {
            ptr::copy_nonoverlapping(payload.as_ptr(), slot.add(SLOT_HEADER_LEN), payload.len());
            (*hdr).payload_len = payload.len() as u32;
            (*hdr).pub_id = pub_id;
            (*hdr).timestamp_ns = clock::now_ns();
            fence(Ordering::Release);
            (*hdr).seq.store(commit_seq, Ordering::Release);
        }
    }
}

/// Best-effort cache prefetch. A hint only; no-op off x86_64.
#[inline(always)]
pub(crate) fn prefetch(p: *const u8) {
    #[cfg(target_arch = "x86_64")]
    // SAFETY: prefetch has no architectural effect; any address is fine.
    unsafe {
        core::arch::x86_64::_mm_prefetch(p as *const i8, core::arch::x86_64::_MM_HINT_T0);
    }
    #[cfg(not(target_arch = "x86_64"))]
    let _ = p;
}
