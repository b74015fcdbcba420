//! Publisher handle: region ownership, send policy, local counters.

use crate::backoff;
use crate::bus::Bus;
use crate::health::PublisherHealth;
use crate::limiter::TokenWindow;
use crate::{OpenError, topic_region_name};
use basalt_region::{Region, RingKind, SLOT_HEADER_LEN, TopicConfig, align_up};
use basalt_ring::{MwmrPublisher, PublishError, RingHealth, SwmrPublisher};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Geometry and policy for one publisher's topic.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub topic: String,
    pub kind: RingKind,
    /// Requested slot count; rounded up to a power of two at init.
    pub slot_count: u32,
    /// Largest payload a slot must hold.
    pub payload_max: u32,
    /// Publishes per second; 0 disables rate limiting.
    pub rate_limit_hz: u64,
    /// When the limiter defers or the ring times out: true = sleep and
    /// retry, false = count a local drop and surface the error.
    pub block_on_full: bool,
}

impl PublisherConfig {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            kind: RingKind::Swmr,
            slot_count: 4096,
            payload_max: 1024,
            rate_limit_hz: 0,
            block_on_full: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("publish deferred by the rate limiter")]
    RateLimited,

    #[error("ring full: timed out waiting for a slot")]
    RingFull,

    #[error("payload of {len} bytes exceeds ring maximum of {max}")]
    TooLarge { len: usize, max: usize },
}

enum RingWriter {
    Swmr(SwmrPublisher),
    Mwmr(MwmrPublisher),
}

impl RingWriter {
    #[inline]
    fn publish(&mut self, payload: &[u8]) -> Result<u64, PublishError> {
        match self {
            RingWriter::Swmr(w) => w.publish(payload),
            RingWriter::Mwmr(w) => w.publish(payload),
        }
    }
}

pub struct Publisher {
    topic: String,
    region: Arc<Region>,
    writer: RingWriter,
    limiter: Option<TokenWindow>,
    block_on_full: bool,
    pub_id: u16,
    published: u64,
    local_drops: u64,
}

impl Publisher {
    /// Initializes a fresh single-topic region named
    /// `basalt-<topic>` and attaches a writer to it. Any prior region
    /// of that name is replaced; use [`Publisher::attach`] to join one
    /// that another process already initialized.
    pub fn create(bus: &Bus, config: &PublisherConfig) -> Result<Publisher, OpenError> {
        let slot_size = align_up(SLOT_HEADER_LEN as u64 + config.payload_max as u64, 8);
        let region_size =
            config.slot_count.next_power_of_two() as u64 * slot_size + (1 << 20);

        let region = Region::init(
            &topic_region_name(&config.topic),
            region_size,
            &[TopicConfig {
                name: config.topic.clone(),
                kind: config.kind,
                slot_count: config.slot_count,
                payload_max: config.payload_max,
            }],
        )?;

        Self::finish(bus, config, Arc::new(region))
    }

    /// Attaches to the topic's existing region. The writer discipline
    /// follows the region's recorded ring kind, so several processes can
    /// attach writers to one MWMR topic.
    pub fn attach(bus: &Bus, config: &PublisherConfig) -> Result<Publisher, OpenError> {
        let region = Region::attach(&topic_region_name(&config.topic))?;
        Self::finish(bus, config, Arc::new(region))
    }

    fn finish(
        bus: &Bus,
        config: &PublisherConfig,
        region: Arc<Region>,
    ) -> Result<Publisher, OpenError> {
        let kind = region
            .lookup(&config.topic)
            .and_then(|t| t.ring_kind())
            .unwrap_or(config.kind);

        let pub_id = bus.alloc_pub_id();
        let writer = match kind {
            RingKind::Swmr => {
                RingWriter::Swmr(SwmrPublisher::attach(region.clone(), &config.topic, pub_id)?)
            }
            RingKind::Mwmr => {
                RingWriter::Mwmr(MwmrPublisher::attach(region.clone(), &config.topic, pub_id)?)
            }
        };

        info!(
            app = bus.name(),
            topic = %config.topic,
            kind = kind.as_str(),
            pub_id,
            "publisher ready"
        );

        Ok(Publisher {
            topic: config.topic.clone(),
            region,
            writer,
            limiter: (config.rate_limit_hz > 0).then(|| TokenWindow::new(config.rate_limit_hz)),
            block_on_full: config.block_on_full,
            pub_id,
            published: 0,
            local_drops: 0,
        })
    }

    /// Publishes one message under the configured send policy. Returns
    /// the commit sequence on success.
    pub fn send(&mut self, payload: &[u8]) -> Result<u64, SendError> {
        if let Some(limiter) = &mut self.limiter {
            let mut attempt = 0u32;
            while limiter.should_defer() {
                if !self.block_on_full {
                    self.local_drops += 1;
                    return Err(SendError::RateLimited);
                }
                thread::sleep(backoff::exponential(attempt));
                attempt += 1;
            }
        }

        loop {
            match self.writer.publish(payload) {
                Ok(seq) => {
                    self.published += 1;
                    return Ok(seq);
                }
                Err(PublishError::Timeout) if self.block_on_full => {
                    thread::sleep(Duration::from_micros(1));
                }
                Err(PublishError::Timeout) => {
                    self.local_drops += 1;
                    debug!(topic = %self.topic, "send dropped: ring full");
                    return Err(SendError::RingFull);
                }
                Err(PublishError::TooLarge { len, max }) => {
                    return Err(SendError::TooLarge { len, max });
                }
            }
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn pub_id(&self) -> u16 {
        self.pub_id
    }

    /// Successful sends through this handle.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Sends this handle dropped locally (rate limit or ring full).
    pub fn local_drops(&self) -> u64 {
        self.local_drops
    }

    /// Snapshot of this publisher and its ring.
    pub fn health(&self) -> PublisherHealth {
        let ring = RingHealth::capture(&self.region, &self.topic);
        PublisherHealth {
            topic: self.topic.clone(),
            pub_id: self.pub_id,
            total_published: ring.as_ref().map_or(0, |r| r.total_published),
            last_publish_ns: ring.as_ref().map_or(0, |r| r.last_publish_ns),
            local_published: self.published,
            local_drops: self.local_drops,
            throttled: self.limiter.as_ref().map_or(0, |l| l.throttled()),
            healthy: self.local_drops == 0,
        }
    }
}
