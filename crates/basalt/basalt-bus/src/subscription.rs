//! Subscription handle: region attachment plus local receive counters.

use crate::bus::Bus;
use crate::health::SubscriberHealth;
use crate::{OpenError, topic_region_name};
use basalt_region::Region;
use basalt_ring::{Recv, Subscriber};
use std::sync::Arc;
use tracing::debug;

pub struct Subscription {
    topic: String,
    /// Keeps the facade's region alive; the inner subscriber holds its
    /// own reference.
    _region: Arc<Region>,
    inner: Subscriber,
    received: u64,
    truncated: u64,
}

impl Subscription {
    /// Attaches to the topic's region by name. The region's header
    /// declares its own size, so attaching needs no geometry from the
    /// caller.
    pub fn open(bus: &Bus, topic: &str) -> Result<Subscription, OpenError> {
        let region = Arc::new(Region::attach(&topic_region_name(topic))?);
        let inner = Subscriber::attach(region.clone(), topic)?;

        debug!(app = bus.name(), topic, "subscription open");

        Ok(Subscription {
            topic: topic.to_string(),
            _region: region,
            inner,
            received: 0,
            truncated: 0,
        })
    }

    /// Polls for the next message; never blocks.
    pub fn recv(&mut self, buf: &mut [u8]) -> Recv {
        let outcome = self.inner.next(buf);
        match outcome {
            Recv::Msg { .. } => self.received += 1,
            Recv::Truncated { .. } => self.truncated += 1,
            Recv::NoData => {}
        }
        outcome
    }

    /// Skips any resident history; deliver only from the current head.
    pub fn seek_to_head(&mut self) {
        self.inner.seek_to_head();
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Messages delivered through this handle.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Messages lost to ring overwrites.
    pub fn skipped(&self) -> u64 {
        self.inner.skipped()
    }

    /// Largest payload the topic can carry; size `recv` buffers to this.
    pub fn max_payload(&self) -> usize {
        self.inner.max_payload()
    }

    /// Snapshot of this subscriber's position and counters.
    pub fn health(&self) -> SubscriberHealth {
        let lag = self.inner.lag();
        SubscriberHealth {
            topic: self.topic.clone(),
            received: self.received,
            skipped: self.inner.skipped(),
            truncated: self.truncated,
            lag,
            healthy: lag < self.inner.slot_count(),
        }
    }
}
