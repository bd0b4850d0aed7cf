//! System toggles → node visibility

use std::collections::HashSet;
use tracing::debug;

use crate::classify::ClassificationIndex;
use crate::rules::HiddenRules;
use crate::scene::{NodeId, SceneGraph};
use crate::systems::SystemRegistry;

/// Applies system toggle state to classified nodes and owns the set of
/// permanently hidden annotation nodes
#[derive(Debug, Default)]
pub struct VisibilityController {
    hidden: HashSet<NodeId>,
    annotations_hidden: bool,
}

impl VisibilityController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide instructional/orientation nodes once per model. Returns how
    /// many nodes were hidden, or `None` if the pass already ran.
    pub fn hide_annotations(&mut self, scene: &mut SceneGraph, rules: &HiddenRules) -> Option<usize> {
        if self.annotations_hidden {
            return None;
        }
        let matched: Vec<NodeId> = scene
            .traverse()
            .filter(|(_, node)| rules.matches(&node.name))
            .map(|(id, _)| id)
            .collect();
        for id in &matched {
            if let Some(node) = scene.node_mut(*id) {
                node.visible = false;
            }
        }
        self.hidden.extend(matched.iter().copied());
        self.annotations_hidden = true;
        debug!(hidden = matched.len(), "Annotation nodes hidden");
        Some(matched.len())
    }

    pub fn is_permanently_hidden(&self, node: NodeId) -> bool {
        self.hidden.contains(&node)
    }

    /// Set every classified node's visibility from its system's flag.
    /// Nodes outside the index and hidden annotations are left alone.
    pub fn apply(&self, scene: &mut SceneGraph, index: &ClassificationIndex, systems: &SystemRegistry) -> usize {
        let mut changed = 0;
        for (id, system) in index.iter() {
            if self.hidden.contains(&id) {
                continue;
            }
            let visible = systems.is_visible(system);
            if let Some(node) = scene.node_mut(id) {
                if node.visible != visible {
                    node.visible = visible;
                    changed += 1;
                }
            }
        }
        changed
    }
}
