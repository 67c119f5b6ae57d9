//! Demo settings
//!
//! Looked up at the path given on the command line, then `./ember.toml`,
//! then `~/.config/ember/ember.toml`. Anything missing falls back to
//! defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use ember_ecs::AppConfig;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppConfig,
    pub demo: DemoSettings,
    pub log: LogSettings,
}

impl Settings {
    fn candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
        if let Some(path) = explicit {
            return vec![path.to_path_buf()];
        }
        let mut paths = vec![PathBuf::from("ember.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("ember").join("ember.toml"));
        }
        paths
    }

    /// Load settings, or return defaults if no usable file is found.
    pub fn load(explicit: Option<&Path>) -> Self {
        let Some(path) = Self::candidates(explicit).into_iter().find(|p| p.exists()) else {
            if let Some(path) = explicit {
                warn!("Settings file {:?} not found, using defaults", path);
            } else {
                info!("No settings file found, using defaults");
            }
            return Self::default();
        };

        match Self::read(&path) {
            Ok(settings) => {
                info!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                warn!("{:#}, using defaults", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        Self::from_toml_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.app.validate()?;
        Ok(settings)
    }
}

/// Shape of the demo scene.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// Frames to run before exiting
    pub frames: u64,
    /// Agents spawned in the first level
    pub agents: usize,
    /// Starting health of each agent
    pub health: i32,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            frames: 8,
            agents: 4,
            health: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.app, AppConfig::default());
        assert_eq!(settings.demo.frames, 8);
        assert_eq!(settings.log.level, "info");
    }

    #[test]
    fn tables_override_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [app]
            pool_size = 32

            [demo]
            agents = 2

            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(settings.app.pool_size, 32);
        assert_eq!(settings.app.system_pool_size, 100);
        assert_eq!(settings.demo.agents, 2);
        assert_eq!(settings.demo.health, 5);
        assert_eq!(settings.log.level, "debug");
    }

    #[test]
    fn invalid_app_section_is_rejected() {
        assert!(Settings::from_toml_str("[app]\npool_size = 0").is_err());
    }
}
