//! Node → anatomical system classification
//!
//! Two strategies are supported:
//! - **Material-exact**: a mesh takes the system of the first of its
//!   materials whose name is an exact key in the material table.
//! - **Name-substring**: a mesh's lower-cased name is tested against each
//!   system's substrings in table order; the first system with a hit wins.
//!
//! Meshes that match nothing are simply absent from the index.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::rules::{NameRule, RuleTables};
use crate::scene::{MaterialId, NodeId, SceneGraph};
use crate::systems::SystemKey;

/// Which rule table drives classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifyMode {
    #[default]
    MaterialExact,
    NameSubstring,
}

/// Immutable node → system mapping for one loaded model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationIndex {
    systems: HashMap<NodeId, SystemKey>,
    /// Classified nodes in traversal order
    order: Vec<NodeId>,
}

impl ClassificationIndex {
    fn insert(&mut self, node: NodeId, system: SystemKey) {
        if self.systems.insert(node, system).is_none() {
            self.order.push(node);
        }
    }

    pub fn get(&self, node: NodeId) -> Option<SystemKey> {
        self.systems.get(&node).copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.systems.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Classified nodes in traversal order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, SystemKey)> + '_ {
        self.order.iter().map(move |id| (*id, self.systems[id]))
    }

    /// Nodes belonging to one system, in traversal order
    pub fn members(&self, system: SystemKey) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().filter(move |(_, s)| *s == system).map(|(id, _)| id)
    }

    pub fn stats(&self, total_meshes: usize) -> ClassificationStats {
        let mut per_system = BTreeMap::new();
        for (_, system) in self.iter() {
            *per_system.entry(system).or_insert(0) += 1;
        }
        ClassificationStats {
            total_meshes,
            classified: self.len(),
            per_system,
        }
    }
}

/// Per-system breakdown reported after a model load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationStats {
    pub total_meshes: usize,
    pub classified: usize,
    pub per_system: BTreeMap<SystemKey, usize>,
}

/// Builds a [`ClassificationIndex`] from a scene and rule tables
pub struct Classifier<'a> {
    mode: ClassifyMode,
    materials: HashMap<&'a str, SystemKey>,
    names: &'a [NameRule],
}

impl<'a> Classifier<'a> {
    pub fn new(rules: &'a RuleTables, mode: ClassifyMode) -> Self {
        Self {
            mode,
            materials: rules.material_table(),
            names: &rules.name_rule,
        }
    }

    pub fn mode(&self) -> ClassifyMode {
        self.mode
    }

    /// Classify every mesh reachable from the root. Read-only.
    pub fn classify(&self, scene: &SceneGraph) -> ClassificationIndex {
        let mut index = ClassificationIndex::default();
        for (id, node) in scene.meshes() {
            let system = match self.mode {
                ClassifyMode::MaterialExact => self.by_material(scene, node.kind.materials()),
                ClassifyMode::NameSubstring => self.by_name(&node.name),
            };
            if let Some(system) = system {
                index.insert(id, system);
            }
        }
        debug!(mode = ?self.mode, classified = index.len(), "Classification pass complete");
        index
    }

    fn by_material(&self, scene: &SceneGraph, materials: &[MaterialId]) -> Option<SystemKey> {
        materials
            .iter()
            .filter_map(|id| scene.material(*id))
            .find_map(|m| self.materials.get(m.name.as_str()).copied())
    }

    fn by_name(&self, name: &str) -> Option<SystemKey> {
        classify_name(name, self.names)
    }
}

/// First system whose substrings hit the lower-cased `name`
pub fn classify_name(name: &str, rules: &[NameRule]) -> Option<SystemKey> {
    if name.is_empty() {
        return None;
    }
    let lower = name.to_lowercase();
    rules.iter().find(|r| r.matches(&lower)).map(|r| r.system)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, NodeKind, SceneNode};

    fn scene() -> SceneGraph {
        let mut graph = SceneGraph::new("Scene");
        let bone = graph.add_material(Material::new("Bone"));
        let artery = graph.add_material(Material::new("Artery"));
        let unknown = graph.add_material(Material::new("Plastic"));
        let body = graph.add_node(graph.root, SceneNode::group("Heart group"));
        graph.add_node(body, SceneNode::mesh("Femur", vec![bone]));
        // first *matching* material decides, not the first material
        graph.add_node(body, SceneNode::mesh("Aorta", vec![unknown, artery, bone]));
        graph.add_node(body, SceneNode::mesh("Widget", vec![unknown]));
        graph.add_node(body, SceneNode::mesh("Broken heart", vec![]));
        graph.add_node(body, SceneNode::new("Lung marker", NodeKind::Other));
        graph
    }

    #[test]
    fn test_material_exact() {
        let rules = RuleTables::default();
        let graph = scene();
        let index = Classifier::new(&rules, ClassifyMode::MaterialExact).classify(&graph);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(NodeId(2)), Some(SystemKey::Skeletal));
        assert_eq!(index.get(NodeId(3)), Some(SystemKey::Cardiovascular));
        assert_eq!(index.get(NodeId(4)), None);
        // mesh without materials is unclassifiable, not an error
        assert_eq!(index.get(NodeId(5)), None);
    }

    #[test]
    fn test_name_substring() {
        let rules = RuleTables::default();
        let graph = scene();
        let index = Classifier::new(&rules, ClassifyMode::NameSubstring).classify(&graph);

        assert_eq!(index.get(NodeId(2)), Some(SystemKey::Skeletal));
        assert_eq!(index.get(NodeId(3)), Some(SystemKey::Cardiovascular));
        assert_eq!(index.get(NodeId(5)), Some(SystemKey::Cardiovascular));
        // groups and non-mesh nodes are never classified
        assert!(!index.contains(NodeId(1)));
        assert!(!index.contains(NodeId(6)));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let rules = RuleTables::default();
        let graph = scene();
        let classifier = Classifier::new(&rules, ClassifyMode::MaterialExact);
        let first = classifier.classify(&graph);
        let second = classifier.classify(&graph);
        assert_eq!(first, second);
        assert_eq!(
            first.iter().collect::<Vec<_>>(),
            second.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_stats_and_members() {
        let rules = RuleTables::default();
        let graph = scene();
        let index = Classifier::new(&rules, ClassifyMode::MaterialExact).classify(&graph);
        let stats = index.stats(graph.meshes().count());

        assert_eq!(stats.total_meshes, 4);
        assert_eq!(stats.classified, 2);
        assert_eq!(stats.per_system.get(&SystemKey::Skeletal), Some(&1));
        assert_eq!(index.members(SystemKey::Cardiovascular).collect::<Vec<_>>(), vec![NodeId(3)]);
    }

    #[test]
    fn test_classify_name_first_match_wins() {
        let rules = vec![
            NameRule { system: SystemKey::Respiratory, patterns: vec!["lung".into()] },
            NameRule { system: SystemKey::Organs, patterns: vec!["lung".into(), "eye".into()] },
        ];
        assert_eq!(classify_name("LUNG left", &rules), Some(SystemKey::Respiratory));
        assert_eq!(classify_name("Eye", &rules), Some(SystemKey::Organs));
        assert_eq!(classify_name("", &rules), None);
    }
}
