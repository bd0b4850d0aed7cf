//! Application state container and its command API

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::interaction::{strip_suffix, InteractionState, SelectedPart, CLICK_SUFFIXES};
use crate::scene::NodeId;
use crate::search::{PartIndex, SearchablePart};
use crate::systems::{SystemKey, SystemRegistry};
use crate::vitals::{TickOutcome, VitalSimEngine, VitalState, VitalsConfig};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Unknown system: {0}")]
    UnknownSystem(String),
    #[error("Unknown part: {0}")]
    UnknownPart(NodeId),
}

/// Everything the UI reads. Mutated only through the methods below.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BodyState {
    pub systems: SystemRegistry,
    /// Owned by the vital commands below when the state is driven
    /// directly. A host that runs the simulation elsewhere (a
    /// `VitalSimService`) only mirrors the published values here.
    pub vitals: VitalState,
    pub interaction: InteractionState,
    #[serde(skip)]
    pub parts: PartIndex,
    pub focused: Option<NodeId>,
    pub model_loaded: bool,
    #[serde(skip)]
    engine: VitalSimEngine,
}

impl BodyState {
    pub fn new(vitals: VitalsConfig) -> Self {
        Self {
            engine: VitalSimEngine::new(vitals),
            ..Default::default()
        }
    }

    pub fn engine(&self) -> &VitalSimEngine {
        &self.engine
    }

    /// Returns the system's new visibility
    pub fn toggle_system(&mut self, key: SystemKey) -> bool {
        let visible = self.systems.toggle(key);
        debug!(system = %key, visible, "System toggled");
        visible
    }

    pub fn toggle_system_by_name(&mut self, name: &str) -> Result<bool, StateError> {
        let key: SystemKey = name.parse()?;
        Ok(self.toggle_system(key))
    }

    pub fn set_heart_rate(&mut self, bpm: u32) -> u32 {
        self.engine.set_heart_rate(&mut self.vitals, bpm)
    }

    pub fn start_running(&mut self) -> bool {
        self.engine.start_running(&mut self.vitals)
    }

    pub fn stop_running(&mut self) -> bool {
        self.engine.stop_running(&mut self.vitals)
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.engine.tick(&mut self.vitals)
    }

    /// Select a part from the search list and focus it
    pub fn select_part(&mut self, id: NodeId) -> Result<&SearchablePart, StateError> {
        let part = self.parts.get(id).ok_or(StateError::UnknownPart(id))?;
        self.interaction.selected = Some(SelectedPart {
            display_name: strip_suffix(&part.original_name, CLICK_SUFFIXES).to_string(),
            original_name: part.original_name.clone(),
            system: part.system,
            node: id,
        });
        self.focused = Some(id);
        Ok(part)
    }

    pub fn clear_selection(&mut self) {
        self.interaction.selected = None;
        self.focused = None;
    }

    /// Unloading drops everything derived from the previous model
    pub fn set_model_loaded(&mut self, loaded: bool) {
        if !loaded {
            self.parts = PartIndex::default();
            self.interaction = InteractionState::default();
            self.focused = None;
        }
        if self.model_loaded != loaded {
            info!(loaded, "Model state changed");
        }
        self.model_loaded = loaded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ClassifyMode, Classifier};
    use crate::rules::RuleTables;
    use crate::scene::{Material, SceneGraph, SceneNode};

    fn loaded() -> BodyState {
        let mut scene = SceneGraph::new("Scene");
        let bone = scene.add_material(Material::new("Bone"));
        scene.add_node(scene.root, SceneNode::mesh("Humerus_left", vec![bone]));
        let rules = RuleTables::default();
        let index = Classifier::new(&rules, ClassifyMode::MaterialExact).classify(&scene);

        let mut state = BodyState::new(VitalsConfig::default());
        state.parts = PartIndex::build(&scene, &index);
        state.set_model_loaded(true);
        state
    }

    #[test]
    fn test_toggle_system() {
        let mut state = BodyState::default();
        assert!(!state.toggle_system(SystemKey::Muscular));
        assert!(state.toggle_system_by_name("MUSCULAR").unwrap());
        assert_eq!(
            state.toggle_system_by_name("endocrine"),
            Err(StateError::UnknownSystem("endocrine".into()))
        );
    }

    #[test]
    fn test_vital_commands() {
        let mut state = BodyState::default();
        assert_eq!(state.set_heart_rate(150), 150);
        assert_eq!(state.vitals.respiration_rate_rpm, 36);
        assert!(state.start_running());
        assert!(matches!(state.tick(), TickOutcome::Running { .. }));
        assert!(state.stop_running());
    }

    #[test]
    fn test_select_and_clear() {
        let mut state = loaded();
        let part = state.select_part(NodeId(1)).unwrap();
        assert_eq!(part.name, "Humerus");

        let selected = state.interaction.selected.as_ref().unwrap();
        assert_eq!(selected.display_name, "Humerus");
        assert_eq!(selected.original_name, "Humerus_left");
        assert_eq!(state.focused, Some(NodeId(1)));

        assert_eq!(state.select_part(NodeId(7)).unwrap_err(), StateError::UnknownPart(NodeId(7)));

        state.clear_selection();
        assert!(state.interaction.selected.is_none());
        assert!(state.focused.is_none());
    }

    #[test]
    fn test_unload_clears_derived_state() {
        let mut state = loaded();
        state.select_part(NodeId(1)).unwrap();
        state.set_heart_rate(100);

        state.set_model_loaded(false);
        assert!(!state.model_loaded);
        assert!(state.parts.is_empty());
        assert!(state.interaction.is_idle());
        assert_eq!(state.vitals.heart_rate_bpm, 100);
    }
}
