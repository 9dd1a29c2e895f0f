use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid engine configuration: {0}")]
pub struct ConfigError(#[from] toml::de::Error);

/// Tunables shared by every query an engine builds.
///
/// # Examples
///
/// ```rust
/// use status_filter::EngineConfig;
///
/// let config = EngineConfig::from_toml_str(r#"
///     status_table = "timeline"
///     refresh_timeout_ms = 2500
/// "#).unwrap();
/// assert_eq!("timeline", config.status_table);
/// assert_eq!(64, config.refilter_capacity);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Table holding persisted statuses, referenced by storage fragments.
    pub status_table: String,
    /// Upper bound for a single collaborator fetch during a refresh.
    pub refresh_timeout_ms: u64,
    /// Buffer of the per-query re-filter channel.
    pub refilter_capacity: usize,
}

impl EngineConfig {
    const DEFAULT_STATUS_TABLE: &'static str = "statuses";
    const DEFAULT_REFRESH_TIMEOUT_MS: u64 = 10_000;
    const DEFAULT_REFILTER_CAPACITY: usize = 64;

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    #[inline]
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            status_table: Self::DEFAULT_STATUS_TABLE.to_owned(),
            refresh_timeout_ms: Self::DEFAULT_REFRESH_TIMEOUT_MS,
            refilter_capacity: Self::DEFAULT_REFILTER_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_the_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();

        assert_eq!(EngineConfig::default(), config);
    }

    #[test]
    fn can_override_every_field() {
        let config = EngineConfig::from_toml_str(
            r#"
            status_table = "home"
            refresh_timeout_ms = 50
            refilter_capacity = 4
            "#,
        )
        .unwrap();

        assert_eq!("home", config.status_table);
        assert_eq!(Duration::from_millis(50), config.refresh_timeout());
        assert_eq!(4, config.refilter_capacity);
    }

    #[test]
    fn reject_unknown_fields() {
        let config = EngineConfig::from_toml_str("status_tabel = \"home\"");

        assert!(config.is_err());
    }
}
