//! Scene graph snapshot consumed from the model loader
//!
//! The renderer owns the real scene; this crate works on an arena copy of it
//! where node and material identity is the index into the arena. Multiple
//! mesh nodes can point at the same `MaterialId`, so anything that mutates a
//! material once per model must dedup by id, not by name.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Root node {0} does not exist")]
    MissingRoot(NodeId),
    #[error("Node {node} references missing child {child}")]
    DanglingChild { node: NodeId, child: NodeId },
    #[error("Node {node} references missing material {material}")]
    DanglingMaterial { node: NodeId, material: MaterialId },
    #[error("Node {0} has more than one parent")]
    SharedChild(NodeId),
}

/// Identity of a node inside a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a material inside a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub usize);

impl std::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Linear RGB color, serialized as `[r, g, b]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::rgb(
            f32::from(channel(0)?) / 255.0,
            f32::from(channel(2)?) / 255.0,
            f32::from(channel(4)?) / 255.0,
        ))
    }

    /// True when every channel is strictly above `threshold`
    pub fn all_above(&self, threshold: f32) -> bool {
        self.r > threshold && self.g > threshold && self.b > threshold
    }
}

impl From<[f32; 3]> for Color {
    fn from(c: [f32; 3]) -> Self {
        Self::rgb(c[0], c[1], c[2])
    }
}

impl From<Color> for [f32; 3] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b]
    }
}

/// Texture slots of a PBR material (asset URIs or image names)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureMaps {
    #[serde(default)]
    pub base_color: Option<String>,
    #[serde(default)]
    pub normal: Option<String>,
    #[serde(default)]
    pub roughness: Option<String>,
    #[serde(default)]
    pub metalness: Option<String>,
    #[serde(default)]
    pub occlusion: Option<String>,
    #[serde(default)]
    pub emissive: Option<String>,
}

impl TextureMaps {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Shared material referenced by one or more mesh nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default = "default_base_color")]
    pub base_color: Color,
    #[serde(default)]
    pub maps: TextureMaps,
    #[serde(default)]
    pub metalness: f32,
    #[serde(default = "default_roughness")]
    pub roughness: f32,
    #[serde(default)]
    pub emissive: Color,
}

fn default_base_color() -> Color {
    Color::WHITE
}

fn default_roughness() -> f32 {
    1.0
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color: default_base_color(),
            maps: TextureMaps::default(),
            metalness: 0.0,
            roughness: default_roughness(),
            emissive: Color::BLACK,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.base_color = color;
        self
    }
}

/// What a node is, resolved once when the snapshot is taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    /// Renderable geometry; materials are listed in primitive order
    Mesh {
        #[serde(default)]
        materials: Vec<MaterialId>,
    },
    Group,
    Other,
}

impl NodeKind {
    pub fn is_mesh(&self) -> bool {
        matches!(self, NodeKind::Mesh { .. })
    }

    /// Materials of a mesh, empty for anything else
    pub fn materials(&self) -> &[MaterialId] {
        match self {
            NodeKind::Mesh { materials } => materials,
            _ => &[],
        }
    }
}

/// World-space bounding box reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub center: Vec3,
    pub size: Vec3,
}

impl Bounds {
    pub fn max_extent(&self) -> f32 {
        self.size.max_element()
    }
}

/// A single node in the scene tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub bounds: Option<Bounds>,
}

fn default_true() -> bool {
    true
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            visible: true,
            scale: Vec3::ONE,
            children: Vec::new(),
            bounds: None,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, materials: Vec<MaterialId>) -> Self {
        Self::new(name, NodeKind::Mesh { materials })
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_bounds(mut self, center: Vec3, size: Vec3) -> Self {
        self.bounds = Some(Bounds { center, size });
        self
    }
}

/// Arena holding a loaded model's node tree and materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneGraph {
    pub root: NodeId,
    pub nodes: Vec<SceneNode>,
    #[serde(default)]
    pub materials: Vec<Material>,
}

impl SceneGraph {
    /// Create a graph holding only an empty root group
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root: NodeId(0),
            nodes: vec![SceneNode::group(root_name)],
            materials: Vec::new(),
        }
    }

    /// Parse a JSON snapshot and validate its indices
    pub fn from_json(content: &str) -> Result<Self, SceneError> {
        let graph: SceneGraph = serde_json::from_str(content)?;
        graph.validate()?;
        Ok(graph)
    }

    /// Load a JSON snapshot from a file
    pub fn from_file(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the snapshot as pretty JSON
    pub fn to_file(&self, path: &Path) -> Result<(), SceneError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that the root exists, every index resolves, and no node has two parents
    pub fn validate(&self) -> Result<(), SceneError> {
        if self.root.0 >= self.nodes.len() {
            return Err(SceneError::MissingRoot(self.root));
        }

        let mut parented: HashSet<NodeId> = HashSet::new();
        for (i, node) in self.nodes.iter().enumerate() {
            let id = NodeId(i);
            for &child in &node.children {
                if child.0 >= self.nodes.len() {
                    return Err(SceneError::DanglingChild { node: id, child });
                }
                if child == self.root || !parented.insert(child) {
                    return Err(SceneError::SharedChild(child));
                }
            }
            for &material in node.kind.materials() {
                if material.0 >= self.materials.len() {
                    return Err(SceneError::DanglingMaterial { node: id, material });
                }
            }
        }
        Ok(())
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Append `node` as the last child of `parent`
    pub fn add_node(&mut self, parent: NodeId, node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    /// First material of a mesh node, if any
    pub fn first_material(&self, id: NodeId) -> Option<MaterialId> {
        self.node(id)
            .and_then(|n| n.kind.materials().first().copied())
    }

    /// Find the first node with exactly this name, in traversal order
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.traverse()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    /// Depth-first, parent-before-children traversal from the root
    pub fn traverse(&self) -> DepthFirst<'_> {
        DepthFirst {
            graph: self,
            stack: vec![self.root],
        }
    }

    /// Ids of all mesh nodes reachable from the root, in traversal order
    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.traverse().filter(|(_, node)| node.kind.is_mesh())
    }
}

/// Pre-order iterator over a [`SceneGraph`]; siblings come out in declaration order
pub struct DepthFirst<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = (NodeId, &'a SceneNode);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            // Dangling ids only exist in unvalidated graphs; skip them
            let Some(node) = self.graph.nodes.get(id.0) else {
                continue;
            };
            self.stack.extend(node.children.iter().rev().copied());
            return Some((id, node));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> SceneGraph {
        let mut graph = SceneGraph::new("Scene");
        let bone = graph.add_material(Material::new("Bone"));
        let body = graph.add_node(graph.root, SceneNode::group("Body"));
        graph.add_node(body, SceneNode::mesh("Femur.l", vec![bone]));
        graph.add_node(body, SceneNode::mesh("Femur.r", vec![bone]));
        graph.add_node(graph.root, SceneNode::group("Labels"));
        graph
    }

    #[test]
    fn test_traversal_is_preorder() {
        let graph = sample();
        let names: Vec<_> = graph.traverse().map(|(_, n)| n.name.as_str()).collect();
        assert_eq!(names, vec!["Scene", "Body", "Femur.l", "Femur.r", "Labels"]);

        let meshes: Vec<_> = graph.meshes().map(|(id, _)| id).collect();
        assert_eq!(meshes, vec![NodeId(2), NodeId(3)]);
    }

    #[test]
    fn test_shared_material_identity() {
        let graph = sample();
        assert_eq!(graph.first_material(NodeId(2)), graph.first_material(NodeId(3)));
        assert_eq!(graph.first_material(NodeId(1)), None);
    }

    #[test]
    fn test_validate_rejects_dangling_indices() {
        let mut graph = sample();
        graph.nodes[1].children.push(NodeId(42));
        assert!(matches!(
            graph.validate(),
            Err(SceneError::DanglingChild { child: NodeId(42), .. })
        ));

        let mut graph = sample();
        graph.nodes[2].kind = NodeKind::Mesh {
            materials: vec![MaterialId(7)],
        };
        assert!(matches!(graph.validate(), Err(SceneError::DanglingMaterial { .. })));

        let mut graph = sample();
        graph.nodes[4].children.push(NodeId(2));
        assert!(matches!(graph.validate(), Err(SceneError::SharedChild(NodeId(2)))));
    }

    #[test]
    fn test_json_snapshot() {
        let json = r#"{
            "root": 0,
            "materials": [{ "name": "Artery", "base_color": [0.8, 0.1, 0.1] }],
            "nodes": [
                { "name": "Scene", "kind": { "type": "group" }, "children": [1] },
                { "name": "Aorta", "kind": { "type": "mesh", "materials": [0] },
                  "scale": [1.0, 2.0, 1.0] }
            ]
        }"#;
        let graph = SceneGraph::from_json(json).unwrap();
        let aorta = graph.node(NodeId(1)).unwrap();
        assert!(aorta.visible);
        assert_eq!(aorta.scale, Vec3::new(1.0, 2.0, 1.0));
        assert_eq!(graph.material(MaterialId(0)).unwrap().roughness, 1.0);
        assert_eq!(graph.find_by_name("Aorta"), Some(NodeId(1)));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scene.json");
        let graph = sample();
        graph.to_file(&path).unwrap();
        assert_eq!(SceneGraph::from_file(&path).unwrap(), graph);
    }

    #[test]
    fn test_color_from_hex() {
        let c = Color::from_hex("#ff0080").unwrap();
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 128.0 / 255.0).abs() < 1e-6);
        assert!(Color::from_hex("fff").is_none());
        assert!(Color::WHITE.all_above(0.95));
    }
}
