use serde::Deserialize;
use std::path::Path;

/// Region topology loaded from TOML, consumed by `basalt-init`.
#[derive(Deserialize, Debug)]
pub struct BusConfig {
    #[serde(default = "defaults::region")]
    pub region: String,
    #[serde(default = "defaults::memory_size_mb")]
    pub memory_size_mb: u64,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    pub topics: Vec<TopicSpec>,
}

#[derive(Deserialize, Debug)]
pub struct TopicSpec {
    pub name: String,
    pub slots: u32,
    pub payload_size: u32,
    #[serde(default)]
    pub kind: KindSpec,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum KindSpec {
    #[default]
    Swmr,
    Mwmr,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn region() -> String {
        "basalt_core".into()
    }

    pub fn memory_size_mb() -> u64 {
        4
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

impl BusConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: BusConfig = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Region size in bytes.
    pub fn memory_size(&self) -> u64 {
        self.memory_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_config() {
        let cfg: BusConfig = toml::from_str(
            r#"
            region = "md_bus"
            memory_size_mb = 32
            log_level = "debug"

            [[topics]]
            name = "ticks"
            slots = 1024
            payload_size = 120

            [[topics]]
            name = "orders"
            slots = 512
            payload_size = 64
            kind = "mwmr"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.region, "md_bus");
        assert_eq!(cfg.memory_size(), 32 * 1024 * 1024);
        assert_eq!(cfg.topics.len(), 2);
        assert_eq!(cfg.topics[0].kind, KindSpec::Swmr);
        assert_eq!(cfg.topics[1].kind, KindSpec::Mwmr);
        assert_eq!(cfg.topics[1].payload_size, 64);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: BusConfig = toml::from_str(
            r#"
            [[topics]]
            name = "demo"
            slots = 16
            payload_size = 40
            "#,
        )
        .unwrap();

        assert_eq!(cfg.region, "basalt_core");
        assert_eq!(cfg.memory_size_mb, 4);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn bad_kind_fails_to_parse() {
        let err = toml::from_str::<BusConfig>(
            r#"
            [[topics]]
            name = "demo"
            slots = 16
            payload_size = 40
            kind = "spmc"
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn missing_file_reports_the_path() {
        match BusConfig::load("/nonexistent/basalt.toml") {
            Err(ConfigError::Read { path, .. }) => assert_eq!(path, "/nonexistent/basalt.toml"),
            other => panic!("expected read error, got {other:?}"),
        }
    }
}
