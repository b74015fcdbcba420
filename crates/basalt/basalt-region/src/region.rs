//! Region lifecycle: initialization, attach-by-name, topic lookup.
//!
//! Exactly one process initializes a region; any number of processes
//! attach to it afterwards. The region persists until explicitly
//! unlinked — dropping a [`Region`] only unmaps this process's view.

use crate::layout::{
    align_up, CACHE_LINE, MAX_TOPICS, MAX_TOPIC_NAME, MIN_REGION_SIZE, REGION_MAGIC,
    REGION_VERSION, RegionHeader, RingDesc, RingKind, SLOT_HEADER_LEN, SlotHeader, TopicEntry,
};
use basalt_mmap::{ShmMap, ShmMapMut, shm_path, shm_unlink};
use std::io;
use std::mem::size_of;
use std::ptr;
use std::sync::atomic::Ordering;

/// Requested geometry for one topic. Slot counts are rounded up to the
/// next power of two and slot sizes to the next 8-byte multiple above
/// `SlotHeader + payload_max` during init.
#[derive(Debug, Clone)]
pub struct TopicConfig {
    pub name: String,
    pub kind: RingKind,
    pub slot_count: u32,
    pub payload_max: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("invalid region arguments: {0}")]
    InvalidArgument(&'static str),

    #[error("failed to access shared-memory object '{path}'")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("region too small: layout needs {needed} bytes, region is {have}")]
    OutOfSpace { needed: u64, have: u64 },

    #[error("not a basalt region (magic {found:#010x})")]
    BadMagic { found: u32 },

    #[error("unsupported region version {found} (expected {REGION_VERSION})")]
    BadVersion { found: u32 },

    #[error("malformed region: {0}")]
    Malformed(&'static str),
}

fn io_err(path: &std::path::Path, source: io::Error) -> RegionError {
    RegionError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Final geometry of one topic, offsets resolved.
struct TopicPlan {
    name: String,
    kind: RingKind,
    slot_count: u32,
    slot_size: u32,
    desc_offset: u64,
    slots_offset: u64,
}

/// Complete region layout, computed before any filesystem effect so an
/// out-of-space request never leaves a half-written object behind.
struct RegionPlan {
    topic_table_offset: u64,
    topics: Vec<TopicPlan>,
}

fn plan(size: u64, topics: &[TopicConfig]) -> Result<RegionPlan, RegionError> {
    if size < MIN_REGION_SIZE {
        return Err(RegionError::InvalidArgument("region size below minimum"));
    }
    if topics.is_empty() {
        return Err(RegionError::InvalidArgument("no topics configured"));
    }
    if topics.len() > MAX_TOPICS {
        return Err(RegionError::InvalidArgument("too many topics"));
    }
    for t in topics {
        if t.name.is_empty() || t.name.len() >= MAX_TOPIC_NAME {
            return Err(RegionError::InvalidArgument("topic name empty or too long"));
        }
        if t.slot_count == 0 || t.payload_max == 0 {
            return Err(RegionError::InvalidArgument(
                "topic slot count and payload size must be nonzero",
            ));
        }
    }

    let topic_table_offset = align_up(size_of::<RegionHeader>() as u64, CACHE_LINE);
    let table_end = topic_table_offset + (topics.len() * size_of::<TopicEntry>()) as u64;
    let desc_array_offset = align_up(table_end, CACHE_LINE);

    let mut cursor = desc_array_offset + (topics.len() * size_of::<RingDesc>()) as u64;
    let mut planned = Vec::with_capacity(topics.len());

    for (i, t) in topics.iter().enumerate() {
        let slot_count = t.slot_count.next_power_of_two();
        let slot_size = align_up(SLOT_HEADER_LEN as u64 + t.payload_max as u64, 8) as u32;

        let slots_offset = align_up(cursor, CACHE_LINE);
        cursor = slots_offset + slot_count as u64 * slot_size as u64;

        planned.push(TopicPlan {
            name: t.name.clone(),
            kind: t.kind,
            slot_count,
            slot_size,
            desc_offset: desc_array_offset + (i * size_of::<RingDesc>()) as u64,
            slots_offset,
        });
    }

    if cursor > size {
        return Err(RegionError::OutOfSpace {
            needed: cursor,
            have: size,
        });
    }

    Ok(RegionPlan {
        topic_table_offset,
        topics: planned,
    })
}

/// An attached shared-memory region.
///
/// Holds the mapping alive and resolves all region offsets against this
/// process's base address. The region itself stores offsets only — raw
/// addresses never cross a process boundary.
pub struct Region {
    /// Owns the mmap lifetime; not accessed directly after setup.
    _shm: ShmMapMut,
    base: *mut u8,
    len: usize,
}

// SAFETY: every cross-process mutable field in the region (w_head, slot
// seq) is accessed through atomics per the ring protocol; the rest of
// the region is immutable after init.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
    /// Creates a fresh region: unlinks any prior object of the same
    /// name, sizes and zeroes the new one, writes the header, topic
    /// table, ring descriptors, and zeroes every slot's sequence
    /// counter. Returns the region attached read/write.
    pub fn init(name: &str, size: u64, topics: &[TopicConfig]) -> Result<Region, RegionError> {
        let layout = plan(size, topics)?;

        let path = shm_path(name);
        let _ = shm_unlink(name);

        let mut shm = ShmMapMut::create_rw(&path, size).map_err(|e| io_err(&path, e))?;
        let base = shm.as_mut_ptr();

        // SAFETY: the mapping is exactly `size` bytes, exclusively ours
        // until this function returns, and every offset below comes from
        // the bounds-checked plan.
        unsafe {
            ptr::write_bytes(base, 0, size as usize);

            ptr::write(
                base as *mut RegionHeader,
                RegionHeader::new(size, layout.topic_table_offset, layout.topics.len() as u32),
            );

            let table = base.add(layout.topic_table_offset as usize) as *mut TopicEntry;
            for (i, t) in layout.topics.iter().enumerate() {
                ptr::write(
                    table.add(i),
                    TopicEntry::new(&t.name, t.kind, t.desc_offset, t.slot_count, t.slot_size),
                );

                ptr::write(
                    base.add(t.desc_offset as usize) as *mut RingDesc,
                    RingDesc::new(t.slot_count, t.slot_size, t.slots_offset),
                );

                // Redundant with the bulk zero above, but the commit
                // protocol depends on every slot starting at seq 0.
                for s in 0..t.slot_count as u64 {
                    let slot = base.add((t.slots_offset + s * t.slot_size as u64) as usize);
                    (*(slot as *mut SlotHeader)).seq.store(0, Ordering::Relaxed);
                }
            }
        }

        Ok(Region {
            _shm: shm,
            base,
            len: size as usize,
        })
    }

    /// Attaches to an existing region by name.
    ///
    /// Probes the first header's worth of bytes to validate the magic
    /// and version and learn the region size, then maps exactly that
    /// many bytes read/write.
    pub fn attach(name: &str) -> Result<Region, RegionError> {
        let path = shm_path(name);

        let header = {
            let probe = ShmMap::open_ro_len(&path, size_of::<RegionHeader>() as u64)
                .map_err(|e| io_err(&path, e))?;
            // SAFETY: the probe mapping is at least one RegionHeader
            // long; RegionHeader is plain data, so a bitwise copy is
            // fine even if the fields turn out to be garbage.
            unsafe { ptr::read(probe.as_ptr() as *const RegionHeader) }
        };

        if header.magic != REGION_MAGIC {
            return Err(RegionError::BadMagic {
                found: header.magic,
            });
        }
        if header.version != REGION_VERSION {
            return Err(RegionError::BadVersion {
                found: header.version,
            });
        }
        if header.size < MIN_REGION_SIZE {
            return Err(RegionError::Malformed("declared size below minimum"));
        }
        let table_end = header
            .topic_table_offset
            .checked_add(header.topic_count as u64 * size_of::<TopicEntry>() as u64)
            .ok_or(RegionError::Malformed("topic table offset overflow"))?;
        if header.topic_count == 0 || table_end > header.size {
            return Err(RegionError::Malformed("topic table out of bounds"));
        }

        let mut shm =
            ShmMapMut::open_rw_len(&path, header.size).map_err(|e| io_err(&path, e))?;
        let base = shm.as_mut_ptr();

        Ok(Region {
            _shm: shm,
            base,
            len: header.size as usize,
        })
    }

    /// Removes the named region object. Existing attachments keep their
    /// mappings.
    pub fn unlink(name: &str) -> io::Result<()> {
        shm_unlink(name)
    }

    #[inline]
    pub fn header(&self) -> &RegionHeader {
        // SAFETY: validated at init/attach; immutable afterwards.
        unsafe { &*(self.base as *const RegionHeader) }
    }

    /// The immutable topic directory.
    pub fn topics(&self) -> &[TopicEntry] {
        let h = self.header();
        // SAFETY: attach bounds-checked the table against the region.
        unsafe {
            std::slice::from_raw_parts(
                self.base.add(h.topic_table_offset as usize) as *const TopicEntry,
                h.topic_count as usize,
            )
        }
    }

    /// Bounded linear scan of the topic table.
    pub fn lookup(&self, name: &str) -> Option<&TopicEntry> {
        self.topics().iter().find(|t| t.name_matches(name))
    }

    /// Resolves a topic entry's ring descriptor.
    #[inline]
    pub fn ring_desc(&self, topic: &TopicEntry) -> &RingDesc {
        // SAFETY: descriptor offsets are written during init and
        // immutable afterwards; w_head access goes through its atomic.
        unsafe { &*(self.base.add(topic.ring_desc_offset as usize) as *const RingDesc) }
    }

    /// Base address of this process's mapping. Ring handles resolve
    /// slot offsets against it.
    #[inline]
    pub fn base(&self) -> *mut u8 {
        self.base
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
