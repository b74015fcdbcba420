//! `basalt-bus`: per-process facade over the basalt ring core.
//!
//! A [`Bus`] is a process-local context that hands out publisher ids.
//! [`Publisher`] and [`Subscription`] wrap a region attachment and a
//! ring handle, map ring outcomes onto a small API-level error set,
//! keep local counters (drops, truncations), and apply the optional
//! send policy: token-window rate limiting and blocking retries with
//! backoff.
//!
//! ```ignore
//! use basalt_bus::{Bus, Publisher, PublisherConfig, Subscription};
//!
//! let bus = Bus::new("ticker");
//! let mut tx = Publisher::create(&bus, &PublisherConfig::new("ticks"))?;
//! let mut rx = Subscription::open(&bus, "ticks")?;
//!
//! tx.send(b"tick")?;
//! let mut buf = [0u8; 1024];
//! rx.recv(&mut buf);
//! ```

pub mod backoff;
mod bus;
mod health;
mod limiter;
mod publisher;
mod subscription;

pub use bus::Bus;
pub use health::{PublisherHealth, SubscriberHealth};
pub use limiter::TokenWindow;
pub use publisher::{Publisher, PublisherConfig, SendError};
pub use subscription::Subscription;

// Re-exported so facade callers rarely need the core crates directly.
pub use basalt_region::RingKind;
pub use basalt_ring::Recv;

use basalt_region::RegionError;
use basalt_ring::AttachError;

/// Name of the single-topic region a [`Publisher`] creates and a
/// [`Subscription`] attaches to for a given topic.
pub fn topic_region_name(topic: &str) -> String {
    format!("basalt-{topic}")
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Attach(#[from] AttachError),
}
