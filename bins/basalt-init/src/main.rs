use anyhow::Context;
use basalt_config::{BusConfig, KindSpec};
use basalt_region::{Region, RingKind, TopicConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/basalt.toml";

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = BusConfig::load(config_path.as_str())
        .with_context(|| format!("loading region config from {config_path}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let topics: Vec<TopicConfig> = config
        .topics
        .iter()
        .map(|t| TopicConfig {
            name: t.name.clone(),
            kind: match t.kind {
                KindSpec::Swmr => RingKind::Swmr,
                KindSpec::Mwmr => RingKind::Mwmr,
            },
            slot_count: t.slots,
            payload_max: t.payload_size,
        })
        .collect();

    let region = Region::init(&config.region, config.memory_size(), &topics)
        .with_context(|| format!("initializing region '{}'", config.region))?;

    info!(
        region = %config.region,
        size_mb = config.memory_size_mb,
        topics = region.header().topic_count,
        "region initialized"
    );

    for topic in region.topics() {
        info!(
            name = topic.name(),
            kind = topic.ring_kind().map_or("?", |k| k.as_str()),
            slots = topic.slot_count,
            slot_size = topic.slot_size,
            "topic ready"
        );
    }

    Ok(())
}
