//! Anatomical systems and their visibility toggles

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::state::StateError;

/// One of the fixed physiological categories mesh nodes are grouped into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemKey {
    Integumentary,
    Skeletal,
    Muscular,
    Cardiovascular,
    Nervous,
    Connective,
    Organs,
    Respiratory,
    Digestive,
    Lymphatic,
}

impl SystemKey {
    pub const ALL: [SystemKey; 10] = [
        SystemKey::Integumentary,
        SystemKey::Skeletal,
        SystemKey::Muscular,
        SystemKey::Cardiovascular,
        SystemKey::Nervous,
        SystemKey::Connective,
        SystemKey::Organs,
        SystemKey::Respiratory,
        SystemKey::Digestive,
        SystemKey::Lymphatic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemKey::Integumentary => "integumentary",
            SystemKey::Skeletal => "skeletal",
            SystemKey::Muscular => "muscular",
            SystemKey::Cardiovascular => "cardiovascular",
            SystemKey::Nervous => "nervous",
            SystemKey::Connective => "connective",
            SystemKey::Organs => "organs",
            SystemKey::Respiratory => "respiratory",
            SystemKey::Digestive => "digestive",
            SystemKey::Lymphatic => "lymphatic",
        }
    }
}

impl std::fmt::Display for SystemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemKey {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SystemKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StateError::UnknownSystem(s.to_string()))
    }
}

/// Display metadata and the current toggle state of one system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDefinition {
    pub key: SystemKey,
    pub label: String,
    pub icon: String,
    /// UI accent color, `#rrggbb`
    pub color: String,
    pub visible: bool,
}

impl SystemDefinition {
    fn new(key: SystemKey, label: &str, icon: &str, color: &str) -> Self {
        Self {
            key,
            label: label.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
            visible: true,
        }
    }
}

/// The fixed set of systems, in sidebar order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemRegistry {
    systems: Vec<SystemDefinition>,
}

impl Default for SystemRegistry {
    fn default() -> Self {
        Self {
            systems: vec![
                SystemDefinition::new(SystemKey::Integumentary, "Integumentary (Skin)", "🧬", "#f0a8c4"),
                SystemDefinition::new(SystemKey::Skeletal, "Skeletal", "🦴", "#e8e0d0"),
                SystemDefinition::new(SystemKey::Muscular, "Muscular", "💪", "#d94f4f"),
                SystemDefinition::new(SystemKey::Cardiovascular, "Cardiovascular", "❤️", "#ff2d7b"),
                SystemDefinition::new(SystemKey::Nervous, "Nervous", "⚡", "#ffd700"),
                SystemDefinition::new(SystemKey::Connective, "Connective", "🔗", "#4fc3f7"),
                SystemDefinition::new(SystemKey::Organs, "Organs & Eyes", "👁️", "#8b5cf6"),
                SystemDefinition::new(SystemKey::Respiratory, "Respiratory", "🫁", "#7dd3fc"),
                SystemDefinition::new(SystemKey::Digestive, "Digestive", "🍽️", "#f59e0b"),
                SystemDefinition::new(SystemKey::Lymphatic, "Lymphatic", "🟢", "#86efac"),
            ],
        }
    }
}

impl SystemRegistry {
    pub fn get(&self, key: SystemKey) -> Option<&SystemDefinition> {
        self.systems.iter().find(|s| s.key == key)
    }

    pub fn is_visible(&self, key: SystemKey) -> bool {
        self.get(key).map(|s| s.visible).unwrap_or(false)
    }

    /// Flip a system's visibility and return the new value
    pub fn toggle(&mut self, key: SystemKey) -> bool {
        match self.systems.iter_mut().find(|s| s.key == key) {
            Some(system) => {
                system.visible = !system.visible;
                system.visible
            }
            None => false,
        }
    }

    /// Set a system's visibility; returns true when it changed
    pub fn set_visible(&mut self, key: SystemKey, visible: bool) -> bool {
        match self.systems.iter_mut().find(|s| s.key == key) {
            Some(system) if system.visible != visible => {
                system.visible = visible;
                true
            }
            _ => false,
        }
    }

    pub fn label(&self, key: SystemKey) -> &str {
        self.get(key).map(|s| s.label.as_str()).unwrap_or(key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SystemDefinition> {
        self.systems.iter()
    }
}
