//! Searchable list of classified parts

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::classify::ClassificationIndex;
use crate::interaction::{strip_suffix, CLICK_SUFFIXES};
use crate::scene::{NodeId, SceneGraph};
use crate::systems::{SystemKey, SystemRegistry};

/// Maximum number of search results returned by default
pub const DEFAULT_LIMIT: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchablePart {
    pub id: NodeId,
    /// Display name with side/attachment markers stripped
    pub name: String,
    pub original_name: String,
    pub system: SystemKey,
    /// Bounds center, when the host supplied bounds
    pub camera_target: Option<Vec3>,
    /// Largest bounds extent
    pub camera_distance: f32,
}

/// Parts of one loaded model in traversal order. Nodes already hidden when
/// the index is built (annotations) are not searchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartIndex {
    parts: Vec<SearchablePart>,
}

impl PartIndex {
    pub fn build(scene: &SceneGraph, index: &ClassificationIndex) -> Self {
        let parts = index
            .iter()
            .filter_map(|(id, system)| {
                let node = scene.node(id).filter(|n| n.visible)?;
                Some(SearchablePart {
                    id,
                    name: strip_suffix(&node.name, CLICK_SUFFIXES).to_string(),
                    original_name: node.name.clone(),
                    system,
                    camera_target: node.bounds.map(|b| b.center),
                    camera_distance: node.bounds.map(|b| b.max_extent()).unwrap_or(0.0),
                })
            })
            .collect();
        Self { parts }
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&SearchablePart> {
        self.parts.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchablePart> {
        self.parts.iter()
    }

    /// Case-insensitive match on part name or system label
    pub fn search(&self, query: &str, systems: &SystemRegistry, limit: usize) -> Vec<&SearchablePart> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.parts
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&query)
                    || systems.label(p.system).to_lowercase().contains(&query)
            })
            .take(limit)
            .collect()
    }
}
