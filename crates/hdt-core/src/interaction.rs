//! Pointer hover/select handling and the shared highlight slot
//!
//! Hover and selection are independent: a node can be selected while
//! another one is hovered. Only hover touches materials. At most one
//! material glows at a time and its original emissive color is restored
//! before any other material is highlighted or hover is cleared.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::classify::ClassificationIndex;
use crate::scene::{Color, MaterialId, NodeId, SceneGraph};
use crate::systems::SystemKey;

/// Emissive color applied to the hovered material
pub const GLOW_EMISSIVE: Color = Color::rgb(0.25, 0.35, 0.55);

/// Single-token side/attachment markers stripped from hover labels
pub const HOVER_SUFFIXES: &[&str] = &[".l", ".r", ".o", ".e", "_l", "_r"];

/// Broader marker list stripped from the selected part's title. Longer
/// patterns come first since the first match is the only one stripped.
pub const CLICK_SUFFIXES: &[&str] = &[
    " origin", "_origin", "-origin", ".origin", " right", "_right", "-right", ".right", " left",
    "_left", "-left", ".left", " end", "_end", "-end", ".end", ".l", ".r", ".o", ".e", "_l", "_r",
    " l", " r",
];

/// Strip the first suffix in `suffixes` that `name` ends with (ASCII
/// case-insensitive), then trailing separators. Never returns an empty label.
pub fn strip_suffix<'a>(name: &'a str, suffixes: &[&str]) -> &'a str {
    let stripped = suffixes
        .iter()
        .find_map(|suffix| {
            let cut = name.len().checked_sub(suffix.len())?;
            if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(suffix) {
                Some(&name[..cut])
            } else {
                None
            }
        })
        .unwrap_or(name)
        .trim_end_matches(|c: char| c.is_whitespace() || c == '_' || c == '.' || c == '-');

    if stripped.is_empty() {
        name
    } else {
        stripped
    }
}

/// Event routed by the renderer's picking layer
pub trait PointerEvent {
    /// Nearest hit node, if the pointer is over any geometry
    fn target(&self) -> Option<NodeId>;
    /// Keep meshes behind the hit point from receiving this event
    fn stop_propagation(&mut self);
}

/// Plain pointer event for hosts without their own event type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerHit {
    pub target: Option<NodeId>,
    pub propagation_stopped: bool,
}

impl PointerHit {
    pub fn on(node: NodeId) -> Self {
        Self {
            target: Some(node),
            propagation_stopped: false,
        }
    }

    pub fn miss() -> Self {
        Self::default()
    }
}

impl PointerEvent for PointerHit {
    fn target(&self) -> Option<NodeId> {
        self.target
    }

    fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoveredPart {
    pub name: String,
    pub system: SystemKey,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedPart {
    pub display_name: String,
    pub original_name: String,
    pub system: SystemKey,
    pub node: NodeId,
}

/// Hover/selection plus the highlight slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionState {
    pub hovered: Option<HoveredPart>,
    pub selected: Option<SelectedPart>,
    pub highlighted: Option<MaterialId>,
    pub saved_emissive: Option<Color>,
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        self.hovered.is_none() && self.selected.is_none()
    }
}

/// Resolves pointer events against a classification index
#[derive(Debug, Clone)]
pub struct InteractionController {
    glow: Color,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self { glow: GLOW_EMISSIVE }
    }
}

impl InteractionController {
    pub fn new(glow: Color) -> Self {
        Self { glow }
    }

    /// Returns true when the event hovered a classified node
    pub fn on_pointer_over(
        &self,
        state: &mut InteractionState,
        scene: &mut SceneGraph,
        index: &ClassificationIndex,
        event: &mut impl PointerEvent,
    ) -> bool {
        event.stop_propagation();

        let Some(node_id) = event.target() else {
            return false;
        };
        let Some(system) = index.get(node_id) else {
            return false;
        };
        let Some(node) = scene.node(node_id) else {
            return false;
        };
        if !node.visible {
            return false;
        }

        state.hovered = Some(HoveredPart {
            name: strip_suffix(&node.name, HOVER_SUFFIXES).to_string(),
            system,
            node: node_id,
        });

        let material = scene.first_material(node_id);
        if material != state.highlighted {
            self.restore_highlight(state, scene);
            if let Some(id) = material {
                if let Some(m) = scene.material_mut(id) {
                    state.saved_emissive = Some(m.emissive);
                    state.highlighted = Some(id);
                    m.emissive = self.glow;
                }
            }
        }

        trace!(node = %node_id, system = %system, "Pointer over");
        true
    }

    /// Clear hover and put the glowing material back
    pub fn on_pointer_out(&self, state: &mut InteractionState, scene: &mut SceneGraph) {
        state.hovered = None;
        self.restore_highlight(state, scene);
    }

    /// Returns the new selection, or `None` if the click was ignored
    pub fn on_click<'s>(
        &self,
        state: &'s mut InteractionState,
        scene: &SceneGraph,
        index: &ClassificationIndex,
        event: &mut impl PointerEvent,
    ) -> Option<&'s SelectedPart> {
        event.stop_propagation();

        let node_id = event.target()?;
        let system = index.get(node_id)?;
        let node = scene.node(node_id)?;
        if !node.visible {
            return None;
        }

        trace!(node = %node_id, system = %system, "Part selected");
        state.selected = Some(SelectedPart {
            display_name: strip_suffix(&node.name, CLICK_SUFFIXES).to_string(),
            original_name: node.name.clone(),
            system,
            node: node_id,
        });
        state.selected.as_ref()
    }

    pub fn clear_selection(&self, state: &mut InteractionState) {
        state.selected = None;
    }

    /// Restore the saved emissive, if any, and empty the slot
    pub fn restore_highlight(&self, state: &mut InteractionState, scene: &mut SceneGraph) {
        let saved = state.saved_emissive.take();
        if let Some(id) = state.highlighted.take() {
            if let (Some(m), Some(color)) = (scene.material_mut(id), saved) {
                m.emissive = color;
            }
        }
    }
}
