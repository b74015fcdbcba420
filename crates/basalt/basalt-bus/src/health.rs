//! Facade-level health snapshots: ring state plus the handle-local
//! counters the region cannot know about.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PublisherHealth {
    pub topic: String,
    pub pub_id: u16,
    /// Ring-wide committed messages (all publishers).
    pub total_published: u64,
    /// Commit timestamp of the ring's newest slot; 0 while in flight.
    pub last_publish_ns: u64,
    /// Successful sends through this handle.
    pub local_published: u64,
    /// Sends this handle dropped (rate limit or ring full).
    pub local_drops: u64,
    /// Rate-limiter deferrals, including ones later retried.
    pub throttled: u64,
    pub healthy: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriberHealth {
    pub topic: String,
    pub received: u64,
    pub skipped: u64,
    pub truncated: u64,
    /// Slots between the write head and this subscriber's cursor.
    pub lag: u64,
    /// False once the lag reaches a full ring (overwrites under way).
    pub healthy: bool,
}
