//! `basalt-ring`: lock-free publish/subscribe rings over a basalt region.
//!
//! Two publisher disciplines share one subscriber:
//!
//! - [`SwmrPublisher`]: single writer, wait-free publish.
//! - [`MwmrPublisher`]: many writers; atomic reservation plus a bounded
//!   wait for the reserved slot's previous generation.
//! - [`Subscriber`]: optimistic reader with torn-read detection and lag
//!   recovery, identical for both disciplines.
//!
//! # Protocol
//!
//! Every message reserves a globally ordered sequence with a fetch-add
//! on the ring's write head; sequence `s` lives in slot
//! `(s - 1) & (slot_count - 1)`. The writer fills the slot, issues a
//! release fence, and release-stores `s` into the slot's sequence
//! counter — the commit point. Readers acquire-load the counter before
//! and after copying; a changed counter means the copy was torn and the
//! frame is discarded.
//!
//! # Example
//!
//! ```ignore
//! use basalt_region::{Region, RingKind, TopicConfig};
//! use basalt_ring::{Recv, SwmrPublisher, Subscriber};
//! use std::sync::Arc;
//!
//! let region = Arc::new(Region::init("demo_bus", 1 << 20, &[TopicConfig {
//!     name: "demo".into(),
//!     kind: RingKind::Swmr,
//!     slot_count: 16,
//!     payload_max: 64,
//! }])?);
//!
//! let mut tx = SwmrPublisher::attach(region.clone(), "demo", 1)?;
//! let mut rx = Subscriber::attach(region, "demo")?;
//!
//! tx.publish(b"hello")?;
//! let mut buf = [0u8; 64];
//! if let Recv::Msg { len, .. } = rx.next(&mut buf) {
//!     assert_eq!(&buf[..len], b"hello");
//! }
//! ```

pub mod clock;
mod health;
mod mwmr;
mod ring;
mod sub;
mod swmr;

pub use health::RingHealth;
pub use mwmr::MwmrPublisher;
pub use ring::{AttachError, PublishError};
pub use sub::{Recv, Subscriber};
pub use swmr::SwmrPublisher;
