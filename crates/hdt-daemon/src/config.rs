//! Configuration loading

use anyhow::Result;
use hdt_core::animation::AnimationConfig;
use hdt_core::classify::ClassifyMode;
use hdt_core::interaction::GLOW_EMISSIVE;
use hdt_core::rules::RuleTables;
use hdt_core::scene::Color;
use hdt_core::vitals::VitalsConfig;
use hdt_runtime::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub vitals: VitalsConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Scene snapshot to load when `--scene` is not given
    #[serde(default)]
    pub scene: Option<PathBuf>,
    /// Headless frame rate
    #[serde(default = "default_frame_rate")]
    pub frame_rate_hz: u32,
    #[serde(default)]
    pub classify_mode: ClassifyMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            scene: None,
            frame_rate_hz: default_frame_rate(),
            classify_mode: ClassifyMode::default(),
        }
    }
}

fn default_frame_rate() -> u32 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    #[serde(default = "default_glow")]
    pub glow: Color,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self { glow: default_glow() }
    }
}

fn default_glow() -> Color {
    GLOW_EMISSIVE
}

/// Rule table override; built-in tables when unset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            classify_mode: self.runtime.classify_mode,
            animation: self.animation.clone(),
            vitals: self.vitals.clone(),
            glow: self.interaction.glow,
        }
    }

    pub fn load_rules(&self) -> Result<RuleTables> {
        match &self.rules.path {
            Some(path) => {
                let rules = RuleTables::from_file(path)?;
                info!(
                    path = %path.display(),
                    materials = rules.material.len(),
                    name_rules = rules.name_rule.len(),
                    "Loaded rule tables"
                );
                Ok(rules)
            }
            None => Ok(RuleTables::default()),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let config = Config {
        runtime: RuntimeConfig {
            scene: Some(PathBuf::from("models/body.json")),
            ..Default::default()
        },
        ..Default::default()
    };

    let content = toml::to_string_pretty(&config)?;
    std::fs::write(path, content)?;
    Ok(())
}
