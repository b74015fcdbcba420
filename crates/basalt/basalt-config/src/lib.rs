pub mod config;

pub use config::{BusConfig, ConfigError, KindSpec, TopicSpec};
