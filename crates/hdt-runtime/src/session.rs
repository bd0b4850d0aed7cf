//! One loaded model and everything derived from it

use hdt_core::animation::{AnimationConfig, AnimationRig};
use hdt_core::camera::CameraRig;
use hdt_core::classify::{ClassificationIndex, ClassificationStats, Classifier, ClassifyMode};
use hdt_core::color::{ColorMapper, ColorStats};
use hdt_core::interaction::{InteractionController, PointerEvent, SelectedPart, GLOW_EMISSIVE};
use hdt_core::rules::{RuleTables, RulesError};
use hdt_core::scene::{Color, NodeId, SceneGraph};
use hdt_core::search::{SearchablePart, DEFAULT_LIMIT};
use hdt_core::state::{BodyState, StateError};
use hdt_core::systems::SystemKey;
use hdt_core::visibility::VisibilityController;
use hdt_core::vitals::{VitalState, VitalsConfig};
use hdt_core::PartIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Knobs for loading a model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub classify_mode: ClassifyMode,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub vitals: VitalsConfig,
    /// Emissive color of the hovered part
    #[serde(default = "default_glow")]
    pub glow: Color,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            classify_mode: ClassifyMode::default(),
            animation: AnimationConfig::default(),
            vitals: VitalsConfig::default(),
            glow: default_glow(),
        }
    }
}

fn default_glow() -> Color {
    GLOW_EMISSIVE
}

/// Summary of the load sequence
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub classification: ClassificationStats,
    pub colors: Option<ColorStats>,
    pub annotations_hidden: usize,
    pub cardiac_nodes: usize,
    pub respiratory_nodes: usize,
    pub parts: usize,
}

pub struct ModelSession {
    scene: SceneGraph,
    index: ClassificationIndex,
    rig: AnimationRig,
    colors: ColorMapper,
    visibility: VisibilityController,
    interaction: InteractionController,
    camera: CameraRig,
    state: BodyState,
    report: LoadReport,
}

impl ModelSession {
    /// Run the model-ready sequence on a freshly loaded scene
    pub fn load(mut scene: SceneGraph, rules: &RuleTables, config: &SessionConfig) -> Result<Self, RulesError> {
        let palette = rules.palette()?;

        let index = Classifier::new(rules, config.classify_mode).classify(&scene);
        let classification = index.stats(scene.meshes().count());

        let mut colors = ColorMapper::new();
        let color_stats = colors.apply(&mut scene, &palette);

        let mut visibility = VisibilityController::new();
        let annotations_hidden = visibility
            .hide_annotations(&mut scene, &rules.hidden)
            .unwrap_or(0);

        let rig = AnimationRig::capture(&scene, config.animation.clone());

        let mut state = BodyState::new(config.vitals.clone());
        state.parts = PartIndex::build(&scene, &index);
        visibility.apply(&mut scene, &index, &state.systems);
        state.set_model_loaded(true);

        let report = LoadReport {
            classification,
            colors: color_stats,
            annotations_hidden,
            cardiac_nodes: rig.cardiac().len(),
            respiratory_nodes: rig.respiratory().len(),
            parts: state.parts.len(),
        };
        info!(
            mode = ?config.classify_mode,
            meshes = report.classification.total_meshes,
            classified = report.classification.classified,
            annotations_hidden,
            cardiac = report.cardiac_nodes,
            respiratory = report.respiratory_nodes,
            "Model loaded"
        );
        for (system, count) in &report.classification.per_system {
            debug!(system = %system, count, "Classified");
        }

        Ok(Self {
            scene,
            index,
            rig,
            colors,
            visibility,
            interaction: InteractionController::new(config.glow),
            camera: CameraRig::default(),
            state,
            report,
        })
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn index(&self) -> &ClassificationIndex {
        &self.index
    }

    pub fn state(&self) -> &BodyState {
        &self.state
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn colors_applied(&self) -> bool {
        self.colors.is_applied()
    }

    /// Animate one frame from the latest published vitals.
    ///
    /// The session never ticks vitals itself: `state().vitals` is a
    /// read-only mirror of whatever the caller passes here, and the
    /// `BodyState` vital commands are not reachable through the session.
    pub fn frame(&mut self, t: f64, vitals: &VitalState) {
        self.rig.apply(&mut self.scene, t, vitals);
        if self.state.vitals != *vitals {
            self.state.vitals = vitals.clone();
        }
    }

    /// Returns whether the camera is still moving
    pub fn camera_step(&mut self) -> bool {
        self.camera.step()
    }

    pub fn pointer_over(&mut self, event: &mut impl PointerEvent) -> bool {
        self.interaction
            .on_pointer_over(&mut self.state.interaction, &mut self.scene, &self.index, event)
    }

    pub fn pointer_out(&mut self) {
        self.interaction
            .on_pointer_out(&mut self.state.interaction, &mut self.scene);
    }

    pub fn click(&mut self, event: &mut impl PointerEvent) -> Option<SelectedPart> {
        self.interaction
            .on_click(&mut self.state.interaction, &self.scene, &self.index, event)
            .cloned()
    }

    /// Flip a system and re-apply visibility. Returns the new flag.
    pub fn toggle_system(&mut self, key: SystemKey) -> bool {
        let visible = self.state.toggle_system(key);
        let changed = self.visibility.apply(&mut self.scene, &self.index, &self.state.systems);
        debug!(system = %key, visible, changed, "Visibility applied");
        visible
    }

    pub fn search(&self, query: &str) -> Vec<&SearchablePart> {
        self.state.parts.search(query, &self.state.systems, DEFAULT_LIMIT)
    }

    /// Select a search result and start the camera toward it
    pub fn select_part(&mut self, id: NodeId) -> Result<(), StateError> {
        let part = self.state.select_part(id)?;
        self.camera.focus_on(part);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.state.clear_selection();
        self.camera.reset();
    }

    /// Release the model. Any glowing material is restored first.
    pub fn teardown(mut self) -> SceneGraph {
        self.interaction
            .restore_highlight(&mut self.state.interaction, &mut self.scene);
        self.state.set_model_loaded(false);
        info!("Model session closed");
        self.scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use hdt_core::interaction::{PointerHit, GLOW_EMISSIVE};
    use hdt_core::scene::{Material, SceneNode};

    fn scene() -> SceneGraph {
        let mut scene = SceneGraph::new("Scene");
        let muscle = scene.add_material(Material::new("Superficial").with_color(Color::WHITE));
        let heart = scene.add_material(Material::new("Artery"));
        let lung = scene.add_material(Material::new("Mucosa"));
        let bone = scene.add_material(Material::new("Bone"));

        let torso = scene.add_node(scene.root, SceneNode::group("Torso"));
        scene.add_node(
            torso,
            SceneNode::mesh("Heart", vec![heart]).with_bounds(Vec3::new(0.0, 1.3, 0.1), Vec3::splat(0.12)),
        );
        scene.add_node(torso, SceneNode::mesh("Left lung", vec![lung]));
        scene.add_node(torso, SceneNode::mesh("Pectoralis major.l", vec![muscle]));
        scene.add_node(torso, SceneNode::mesh("Rib 1.l", vec![bone]));
        scene.add_node(scene.root, SceneNode::mesh("Text_heart", vec![heart]));
        scene
    }

    fn load() -> ModelSession {
        ModelSession::load(scene(), &RuleTables::default(), &SessionConfig::default()).unwrap()
    }

    #[test]
    fn test_load_sequence() {
        let session = load();
        let report = session.report();
        assert_eq!(report.classification.total_meshes, 5);
        assert_eq!(report.annotations_hidden, 1);
        // the hidden Text_heart label is not animated
        assert_eq!(report.cardiac_nodes, 1);
        assert_eq!(report.respiratory_nodes, 3);
        assert!(session.colors_applied());
        assert!(session.state().model_loaded);

        let label = session.scene().find_by_name("Text_heart").unwrap();
        assert!(!session.scene().node(label).unwrap().visible);
    }

    #[test]
    fn test_toggle_updates_scene() {
        let mut session = load();
        let heart = session.scene().find_by_name("Heart").unwrap();
        let system = session.index().get(heart).unwrap();

        assert!(!session.toggle_system(system));
        assert!(!session.scene().node(heart).unwrap().visible);
        assert!(session.toggle_system(system));
        assert!(session.scene().node(heart).unwrap().visible);
    }

    #[test]
    fn test_frame_is_repeatable() {
        let mut session = load();
        let vitals = VitalState::default();
        session.frame(0.05, &vitals);
        let first = session.scene().clone();
        session.frame(0.05, &vitals);
        assert_eq!(session.scene(), &first);

        session.frame(0.0, &vitals);
        let heart = session.scene().find_by_name("Heart").unwrap();
        assert_eq!(session.scene().node(heart).unwrap().scale, Vec3::ONE);
    }

    #[test]
    fn test_frame_mirrors_published_vitals() {
        let mut session = load();
        assert_eq!(session.state().vitals, VitalState::default());

        let engine = session.state().engine().clone();
        let mut published = VitalState::default();
        engine.set_heart_rate(&mut published, 150);
        engine.start_running(&mut published);
        engine.tick(&mut published);

        session.frame(0.5, &published);
        assert_eq!(session.state().vitals, published);
        assert_eq!(session.state().vitals.heart_rate_bpm, 150);
        assert!(session.state().vitals.is_running);

        // a later frame replaces the mirror wholesale
        session.frame(0.6, &VitalState::default());
        assert_eq!(session.state().vitals, VitalState::default());
    }

    #[test]
    fn test_hidden_label_ignores_pointer() {
        let mut session = load();
        let heart = session.scene().find_by_name("Heart").unwrap();
        let label = session.scene().find_by_name("Text_heart").unwrap();
        let material = session.scene().first_material(label).unwrap();
        assert_eq!(session.scene().first_material(heart), Some(material));
        let before = session.scene().material(material).unwrap().emissive;

        assert!(!session.pointer_over(&mut PointerHit::on(label)));
        assert!(session.state().interaction.hovered.is_none());
        assert_eq!(session.scene().material(material).unwrap().emissive, before);
        assert!(session.click(&mut PointerHit::on(label)).is_none());
    }

    #[test]
    fn test_select_part_focuses_camera() {
        let mut session = load();
        let heart = session.scene().find_by_name("Heart").unwrap();
        assert_eq!(session.search("hear").len(), 1);

        session.select_part(heart).unwrap();
        assert!(session.camera().is_animating());
        assert_eq!(session.state().focused, Some(heart));
        while session.camera_step() {}
        assert!(session.camera().look_at.distance(Vec3::new(0.0, 1.3, 0.1)) < 0.01);

        session.clear_selection();
        assert!(session.state().interaction.selected.is_none());
        assert!(session.select_part(NodeId(999)).is_err());
    }

    #[test]
    fn test_teardown_restores_highlight() {
        let mut session = load();
        let heart = session.scene().find_by_name("Heart").unwrap();
        let material = session.scene().first_material(heart).unwrap();
        let before = session.scene().material(material).unwrap().emissive;

        assert!(session.pointer_over(&mut PointerHit::on(heart)));
        assert_eq!(session.scene().material(material).unwrap().emissive, GLOW_EMISSIVE);
        assert!(session.click(&mut PointerHit::on(heart)).is_some());

        let scene = session.teardown();
        assert_eq!(scene.material(material).unwrap().emissive, before);
    }
}
