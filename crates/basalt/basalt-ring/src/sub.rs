//! Optimistic subscriber, shared by both ring disciplines.
//!
//! The reader never blocks and never takes a lock: it targets the next
//! sequence it has not delivered, copies the slot, and re-checks the
//! slot's sequence counter afterwards. If the writer lapped the slot
//! mid-copy, the frame is discarded and the gap is charged to the skip
//! counter. A reader that keeps up (lag < slot_count) sees every
//! message exactly once, in order.

use crate::ring::{AttachError, RingRef, prefetch};
use basalt_region::{Region, SLOT_HEADER_LEN, SlotHeader};
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{Ordering, fence};

/// Outcome of one [`Subscriber::next`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recv {
    /// One message copied into the caller's buffer.
    Msg { len: usize, seq: u64, pub_id: u16 },
    /// Nothing new; poll again.
    NoData,
    /// The pending message needed `len` bytes and the buffer was
    /// smaller. The message is consumed, not re-delivered.
    Truncated { len: usize },
}

pub struct Subscriber {
    ring: RingRef,
    /// Sequence of the last message delivered (or skipped past).
    last_seq: u64,
    /// Messages that existed but were overwritten before delivery.
    skipped: u64,
}

impl Subscriber {
    /// Attaches a subscriber to any topic; the reader protocol is
    /// identical for SWMR and MWMR rings. Delivery starts from the
    /// oldest message still resident.
    pub fn attach(region: Arc<Region>, topic: &str) -> Result<Self, AttachError> {
        let (ring, _kind) = RingRef::attach(region, topic)?;
        Ok(Self {
            ring,
            last_seq: 0,
            skipped: 0,
        })
    }

    /// Attempts to copy the next message into `buf`.
    pub fn next(&mut self, buf: &mut [u8]) -> Recv {
        let mut w = self.ring.head();
        let mut next = self.last_seq + 1;

        // Nothing new.
        if next > w {
            return Recv::NoData;
        }

        // Lag jump: the writer overran us by a full ring. Everything up
        // to w - slot_count is gone; charge the gap and restart at the
        // oldest slot that can still be intact.
        let slot_count = self.ring.slot_count();
        if w - next >= slot_count {
            let new_start = w - slot_count + 1;
            self.skipped += new_start - next;
            self.last_seq = new_start - 1;
            next = new_start;
            w = self.ring.head();
            if next > w {
                return Recv::NoData;
            }
        }

        let slot = self.ring.slot_ptr((next - 1) & self.ring.mask());
        let hdr = slot as *const SlotHeader;
        // Warm the slot we will most likely read next call.
        prefetch(self.ring.slot_ptr(next & self.ring.mask()) as *const u8);

        // SAFETY: hdr points at a slot header inside the mapping.
        let seq = unsafe { &(*hdr).seq }.load(Ordering::Acquire);

        // Not yet committed by the writer holding this sequence.
        if seq == 0 || seq < next {
            return Recv::NoData;
        }

        // The writer lapped past this slot since we loaded the head.
        if seq > next {
            self.skipped += seq - next;
            self.last_seq = seq - 1;
            return Recv::NoData;
        }

        // SAFETY: plain reads of header fields; a racing overwrite is
        // caught by the seqlock recheck below.
        let payload_len = unsafe { (*hdr).payload_len } as usize;

        // A length beyond the ring's maximum can only come from an
        // in-flight overwrite; never trust it for the copy.
        if payload_len > self.ring.max_payload() {
            self.skipped += 1;
            self.last_seq = w;
            return Recv::NoData;
        }

        if payload_len > buf.len() {
            // Step past the oversized frame so the caller cannot
            // livelock on it.
            self.last_seq = next;
            return Recv::Truncated { len: payload_len };
        }

        // SAFETY: payload_len is within the slot and within buf.
        unsafe {
            ptr::copy_nonoverlapping(slot.add(SLOT_HEADER_LEN), buf.as_mut_ptr(), payload_len);
        }
        let pub_id = unsafe { (*hdr).pub_id };

        // Torn-read check: if the sequence moved while we copied, the
        // writer lapped us mid-frame. Discard and resynchronize at the
        // head observed on entry.
        fence(Ordering::Acquire);
        let post = unsafe { &(*hdr).seq }.load(Ordering::Relaxed);
        if post != seq {
            self.skipped += 1;
            self.last_seq = w;
            return Recv::NoData;
        }

        self.last_seq = next;
        Recv::Msg {
            len: payload_len,
            seq: next,
            pub_id,
        }
    }

    /// Skips history and follows the ring from its current head; only
    /// messages published after this call are delivered.
    pub fn seek_to_head(&mut self) {
        self.last_seq = self.ring.head();
    }

    /// Sequence of the most recently delivered (or skipped-past) message.
    #[inline]
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Messages lost to overwrites since attach.
    #[inline]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Slots between the write head and this reader's cursor.
    #[inline]
    pub fn lag(&self) -> u64 {
        self.ring.head().saturating_sub(self.last_seq)
    }

    /// This ring's slot count; a lag at or beyond it means overwrites.
    #[inline]
    pub fn slot_count(&self) -> u64 {
        self.ring.slot_count()
    }

    /// Largest payload this ring's slots can carry; size receive
    /// buffers to this to never see [`Recv::Truncated`].
    #[inline]
    pub fn max_payload(&self) -> usize {
        self.ring.max_payload()
    }
}
