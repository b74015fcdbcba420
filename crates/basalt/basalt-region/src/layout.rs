//! Binary layout of a basalt region.
//!
//! The layout is a shared contract between unrelated processes, so every
//! struct here is `#[repr(C)]`, stores offsets rather than pointers, and
//! keeps its atomic fields naturally aligned. Multi-byte integers are
//! host-endian; a region never leaves the host.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ RegionHeader                                  (1 cache line) │
//! ├──────────────────────────────────────────────────────────────┤
//! │ TopicEntry[topic_count]                                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ RingDesc[topic_count]            (64-aligned, 1 line each)   │
//! ├──────────────────────────────────────────────────────────────┤
//! │ slots for topic 0                (64-aligned)                │
//! │   ┌────────────┬────────────────────────────┐                │
//! │   │ SlotHeader │ payload bytes              │  × slot_count  │
//! │   └────────────┴────────────────────────────┘                │
//! ├──────────────────────────────────────────────────────────────┤
//! │ slots for topic 1 ...                                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::mem::size_of;
use std::sync::atomic::AtomicU64;

/// Magic number identifying a valid basalt region.
pub const REGION_MAGIC: u32 = 0x5553_524C;

/// Region format version. Any layout change bumps this; attach rejects a
/// mismatch.
pub const REGION_VERSION: u32 = 1;

/// Fixed width of a topic name, including the NUL terminator.
pub const MAX_TOPIC_NAME: usize = 64;

/// Alignment for the header, topic table, descriptors and slot arrays.
pub const CACHE_LINE: u64 = 64;

/// Smallest region `init` will accept.
pub const MIN_REGION_SIZE: u64 = 4096;

/// Upper bound on topics per region; lookups are a bounded linear scan.
pub const MAX_TOPICS: usize = 256;

/// Rounds `v` up to the next multiple of `a` (`a` must be a power of two).
#[inline(always)]
pub const fn align_up(v: u64, a: u64) -> u64 {
    (v + (a - 1)) & !(a - 1)
}

/// Ring discipline tag stored in each topic entry. The values are part
/// of the region format; zero is deliberately unused so a zeroed or
/// corrupt entry never decodes to a valid kind.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RingKind {
    /// Single writer, multiple readers.
    Swmr = 1,
    /// Multiple writers, multiple readers.
    Mwmr = 2,
}

impl RingKind {
    pub fn from_raw(v: u32) -> Option<RingKind> {
        match v {
            1 => Some(RingKind::Swmr),
            2 => Some(RingKind::Mwmr),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RingKind::Swmr => "SWMR",
            RingKind::Mwmr => "MWMR",
        }
    }
}

/// Header at offset 0 of every region. Occupies a full cache line so it
/// never shares one with the topic table.
#[repr(C)]
pub struct RegionHeader {
    /// Must equal [`REGION_MAGIC`]; anything else is a foreign object.
    pub magic: u32,
    /// Must equal [`REGION_VERSION`].
    pub version: u32,
    /// Total region size in bytes. Attach maps exactly this many.
    pub size: u64,
    /// Offset of the `TopicEntry` array.
    pub topic_table_offset: u64,
    /// Number of entries in the topic table.
    pub topic_count: u32,
    _pad: [u8; 36],
}

impl RegionHeader {
    pub fn new(size: u64, topic_table_offset: u64, topic_count: u32) -> Self {
        Self {
            magic: REGION_MAGIC,
            version: REGION_VERSION,
            size,
            topic_table_offset,
            topic_count,
            _pad: [0; 36],
        }
    }
}

/// One named topic. The table is written once during init and immutable
/// afterwards, so lookups need no synchronization.
#[repr(C)]
pub struct TopicEntry {
    /// NUL-terminated topic name.
    pub name: [u8; MAX_TOPIC_NAME],
    /// Offset of this topic's [`RingDesc`].
    pub ring_desc_offset: u64,
    /// Raw [`RingKind`] value.
    pub kind: u32,
    /// Slot count, always a power of two.
    pub slot_count: u32,
    /// Slot size in bytes (header + payload), 8-byte aligned.
    pub slot_size: u32,
    _pad: u32,
}

impl TopicEntry {
    pub fn new(
        name: &str,
        kind: RingKind,
        ring_desc_offset: u64,
        slot_count: u32,
        slot_size: u32,
    ) -> Self {
        let mut buf = [0u8; MAX_TOPIC_NAME];
        let bytes = name.as_bytes();
        // init validates name length; keep the NUL terminator regardless
        let n = bytes.len().min(MAX_TOPIC_NAME - 1);
        buf[..n].copy_from_slice(&bytes[..n]);
        Self {
            name: buf,
            ring_desc_offset,
            kind: kind as u32,
            slot_count,
            slot_size,
            _pad: 0,
        }
    }

    /// Name up to the first NUL. Empty if the bytes are not UTF-8.
    pub fn name(&self) -> &str {
        let n = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_TOPIC_NAME);
        std::str::from_utf8(&self.name[..n]).unwrap_or("")
    }

    #[inline]
    pub fn name_matches(&self, other: &str) -> bool {
        self.name() == other
    }

    pub fn ring_kind(&self) -> Option<RingKind> {
        RingKind::from_raw(self.kind)
    }
}

/// Per-ring descriptor. One cache line, so the hot `w_head` counter does
/// not false-share with neighbouring descriptors.
#[repr(C)]
pub struct RingDesc {
    /// Slot count, power of two.
    pub slot_count: u32,
    /// Slot size in bytes.
    pub slot_size: u32,
    /// Offset of this ring's slot array.
    pub base_offset: u64,
    /// Total committed messages. Reservation point for every publisher;
    /// the most recently committed sequence equals this value.
    pub w_head: AtomicU64,
    _pad: [u8; 40],
}

impl RingDesc {
    pub fn new(slot_count: u32, slot_size: u32, base_offset: u64) -> Self {
        Self {
            slot_count,
            slot_size,
            base_offset,
            w_head: AtomicU64::new(0),
            _pad: [0; 40],
        }
    }

    /// Index mask for this ring.
    #[inline(always)]
    pub fn mask(&self) -> u64 {
        self.slot_count as u64 - 1
    }
}

/// Header at the start of every slot, followed by payload bytes.
///
/// `seq` doubles as seqlock commit marker and generation tag: it is zero
/// until the slot's first commit, and each commit stores the message's
/// global sequence, which advances the slot by exactly `slot_count`.
/// The slot array is 8-byte aligned and slot sizes are multiples of 8,
/// so `seq` never straddles a cache line.
#[repr(C)]
pub struct SlotHeader {
    /// Seqlock commit marker; 0 = never written.
    pub seq: AtomicU64,
    /// Monotonic nanoseconds at commit.
    pub timestamp_ns: u64,
    /// Payload length in bytes.
    pub payload_len: u32,
    /// Process-local id of the committing publisher.
    pub pub_id: u16,
    _pad: u16,
}

/// Bytes occupied by a [`SlotHeader`] at the start of each slot.
pub const SLOT_HEADER_LEN: usize = size_of::<SlotHeader>();

const _: () = assert!(SLOT_HEADER_LEN % 8 == 0);
const _: () = assert!(size_of::<RegionHeader>() == CACHE_LINE as usize);
const _: () = assert!(size_of::<RingDesc>() == CACHE_LINE as usize);

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::align_of;

    #[test]
    fn layout_is_stable() {
        // These sizes are part of the cross-process contract; a change
        // here requires a REGION_VERSION bump.
        assert_eq!(size_of::<RegionHeader>(), 64);
        assert_eq!(size_of::<TopicEntry>(), 88);
        assert_eq!(size_of::<RingDesc>(), 64);
        assert_eq!(size_of::<SlotHeader>(), 24);
        assert_eq!(align_of::<SlotHeader>(), 8);
    }

    #[test]
    fn align_up_rounds_to_boundary() {
        assert_eq!(align_up(0, 64), 0);
        assert_eq!(align_up(1, 64), 64);
        assert_eq!(align_up(64, 64), 64);
        assert_eq!(align_up(65, 8), 72);
    }

    #[test]
    fn ring_kind_round_trips() {
        assert_eq!(RingKind::from_raw(1), Some(RingKind::Swmr));
        assert_eq!(RingKind::from_raw(2), Some(RingKind::Mwmr));
        assert_eq!(RingKind::from_raw(0), None);
        assert_eq!(RingKind::from_raw(3), None);
        assert_eq!(RingKind::Mwmr.as_str(), "MWMR");
    }

    #[test]
    fn topic_entry_name_is_nul_bounded() {
        let t = TopicEntry::new("orders", RingKind::Mwmr, 128, 1024, 152);
        assert_eq!(t.name(), "orders");
        assert!(t.name_matches("orders"));
        assert!(!t.name_matches("order"));
        assert_eq!(t.ring_kind(), Some(RingKind::Mwmr));
    }
}
