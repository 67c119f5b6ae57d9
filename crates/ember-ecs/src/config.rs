use serde::Deserialize;

use crate::error::ConfigError;

/// Sizing for an [`App`](crate::App). Every field has a default, so an
/// empty TOML table is a valid config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Initial capacity of the live entity pool and of each deferred queue.
    pub pool_size: usize,
    /// Expected component count handed to `System::finalize`.
    pub system_pool_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pool_size: 100,
            system_pool_size: 100,
        }
    }
}

impl AppConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the app cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid("pool_size must be greater than zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.pool_size, 100);
        assert_eq!(config.system_pool_size, 100);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = AppConfig::from_toml_str("pool_size = 512").unwrap();
        assert_eq!(config.pool_size, 512);
        assert_eq!(config.system_pool_size, 100);
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn rejects_zero_pool() {
        assert!(matches!(
            AppConfig::from_toml_str("pool_size = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_toml_str("pool_size = \"big\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
