//! HDT Core - Anatomical scene classification and physiology for the Human Digital Twin
//!
//! This crate provides the renderer-independent core:
//! - Scene snapshot arena (nodes, shared materials) and its JSON format
//! - Rule tables mapping material and node names to body systems
//! - Classification, one-time anatomical tinting and system visibility
//! - Procedural heartbeat/breathing animation driven by vital signs
//! - Hover/select interaction, part search and camera focus
//! - The treadmill effort simulation and the state container

pub mod animation;
pub mod camera;
pub mod classify;
pub mod color;
pub mod interaction;
pub mod rules;
pub mod scene;
pub mod search;
pub mod state;
pub mod systems;
pub mod visibility;
pub mod vitals;

pub use animation::{AnimationConfig, AnimationRig};
pub use camera::CameraRig;
pub use classify::{ClassificationIndex, ClassificationStats, Classifier, ClassifyMode};
pub use color::{ColorMapper, ColorStats};
pub use interaction::{InteractionController, InteractionState, PointerEvent, PointerHit};
pub use rules::{RuleTables, RulesError};
pub use scene::{Color, Material, MaterialId, NodeId, NodeKind, SceneError, SceneGraph, SceneNode};
pub use search::{PartIndex, SearchablePart};
pub use state::{BodyState, StateError};
pub use systems::{SystemKey, SystemRegistry};
pub use visibility::VisibilityController;
pub use vitals::{TickOutcome, VitalSimEngine, VitalState, VitalsConfig};
