//! `basalt-region`: the shared-memory region format and lifecycle.
//!
//! A region is one named shared-memory object holding a self-describing
//! layout: a header, an immutable topic directory, per-ring descriptors,
//! and the slot arrays the rings publish into. This crate owns that
//! byte-level contract; `basalt-ring` implements the publish/subscribe
//! protocol on top of it.
//!
//! - [`Region::init`] builds a fresh region from a list of [`TopicConfig`]s
//! - [`Region::attach`] maps an existing region by name
//! - [`Region::lookup`] resolves a topic to its [`TopicEntry`]

mod layout;
mod region;

pub use layout::{
    CACHE_LINE, MAX_TOPIC_NAME, MAX_TOPICS, MIN_REGION_SIZE, REGION_MAGIC, REGION_VERSION,
    RegionHeader, RingDesc, RingKind, SLOT_HEADER_LEN, SlotHeader, TopicEntry, align_up,
};
pub use region::{Region, RegionError, TopicConfig};
