//! Procedural heartbeat and breathing animation
//!
//! Two node sets are captured once per model by name keyword. Every frame,
//! closed-form waveforms of elapsed time and the current vital rates give
//! scale factors, which are always applied to each node's captured base
//! scale so nothing drifts between frames.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use tracing::debug;

use crate::rules::contains_any;
use crate::scene::{NodeId, SceneGraph};
use crate::vitals::VitalState;

/// Waveform shape and node selection for the animation rig
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Systolic ("lub") lobe amplitude
    #[serde(default = "default_lub")]
    pub lub_amplitude: f64,
    /// Diastolic ("dub") lobe amplitude
    #[serde(default = "default_dub")]
    pub dub_amplitude: f64,
    /// Respiratory expansion per axis, `[kx, ky, kz]`
    #[serde(default = "default_expansion")]
    pub expansion: [f64; 3],
    #[serde(default = "default_cardiac_keywords")]
    pub cardiac_keywords: Vec<String>,
    #[serde(default = "default_respiratory_keywords")]
    pub respiratory_keywords: Vec<String>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            lub_amplitude: default_lub(),
            dub_amplitude: default_dub(),
            expansion: default_expansion(),
            cardiac_keywords: default_cardiac_keywords(),
            respiratory_keywords: default_respiratory_keywords(),
        }
    }
}

fn default_lub() -> f64 {
    0.06
}

fn default_dub() -> f64 {
    0.03
}

fn default_expansion() -> [f64; 3] {
    [0.015, 0.02, 0.03]
}

fn default_cardiac_keywords() -> Vec<String> {
    ["heart", "ventricle", "atrium", "aorta", "coronary", "pulmonary trunk", "cardiac"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_respiratory_keywords() -> Vec<String> {
    ["lung", "diaphragm", "pleura", "pectoralis", "intercostal", "rib", "bronchi"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Two-lobe "lub-dub" pulse magnitude at time `t` seconds.
///
/// `bpm` must be positive.
pub fn cardiac_pulse(t: f64, bpm: f64, lub: f64, dub: f64) -> f64 {
    debug_assert!(bpm > 0.0, "heart rate must be positive");
    let freq = bpm / 60.0;
    let phase = (t * freq * TAU).rem_euclid(TAU);
    let n = phase / TAU;

    if n < 0.10 {
        (n / 0.10 * PI).sin() * lub
    } else if n < 0.15 {
        0.0
    } else if n < 0.25 {
        ((n - 0.15) / 0.10 * PI).sin() * dub
    } else {
        0.0
    }
}

/// Breathing phase in `[0, 1]`; 0.5 at `t = 0`.
///
/// `rpm` must be positive.
pub fn respiratory_cycle(t: f64, rpm: f64) -> f64 {
    debug_assert!(rpm > 0.0, "respiration rate must be positive");
    let freq = rpm / 60.0;
    ((t * freq * TAU).sin() + 1.0) / 2.0
}

/// Per-axis breathing multipliers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expansion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

pub fn respiratory_expansion(t: f64, rpm: f64, k: [f64; 3]) -> Expansion {
    let cycle = respiratory_cycle(t, rpm);
    Expansion {
        x: 1.0 + cycle * k[0],
        y: 1.0 + cycle * k[1],
        z: 1.0 + cycle * k[2],
    }
}

/// A node registered for animation with the scale it had at capture time
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedNode {
    pub node: NodeId,
    pub base_scale: Vec3,
    /// Diaphragm-like nodes move along Y only
    pub vertical: bool,
}

/// Cardiac and respiratory node sets for one loaded model
#[derive(Debug, Clone)]
pub struct AnimationRig {
    cardiac: Vec<AnimatedNode>,
    respiratory: Vec<AnimatedNode>,
    config: AnimationConfig,
}

impl AnimationRig {
    /// Scan every node once; a node that is cardiac is never also respiratory.
    /// Nodes already hidden at capture time (annotation labels) are skipped.
    pub fn capture(scene: &SceneGraph, config: AnimationConfig) -> Self {
        let mut cardiac = Vec::new();
        let mut respiratory = Vec::new();

        for (id, node) in scene.traverse() {
            if node.name.is_empty() || !node.visible {
                continue;
            }
            let lower = node.name.to_lowercase();
            let entry = AnimatedNode {
                node: id,
                base_scale: node.scale,
                vertical: lower.contains("diaphragm"),
            };
            if contains_any(&lower, &config.cardiac_keywords) {
                cardiac.push(entry);
            } else if contains_any(&lower, &config.respiratory_keywords) {
                respiratory.push(entry);
            }
        }

        debug!(
            cardiac = cardiac.len(),
            respiratory = respiratory.len(),
            "Animation rig captured"
        );
        Self {
            cardiac,
            respiratory,
            config,
        }
    }

    pub fn cardiac(&self) -> &[AnimatedNode] {
        &self.cardiac
    }

    pub fn respiratory(&self) -> &[AnimatedNode] {
        &self.respiratory
    }

    pub fn is_empty(&self) -> bool {
        self.cardiac.is_empty() && self.respiratory.is_empty()
    }

    /// Target scale of every animated node at time `t`. Pure.
    pub fn scales_at(&self, t: f64, vitals: &VitalState) -> Vec<(NodeId, Vec3)> {
        let mut out = Vec::with_capacity(self.cardiac.len() + self.respiratory.len());

        if !self.cardiac.is_empty() {
            let pulse = cardiac_pulse(
                t,
                f64::from(vitals.heart_rate_bpm),
                self.config.lub_amplitude,
                self.config.dub_amplitude,
            );
            let s = (1.0 + pulse) as f32;
            out.extend(self.cardiac.iter().map(|e| (e.node, e.base_scale * s)));
        }

        if !self.respiratory.is_empty() {
            let e = respiratory_expansion(t, f64::from(vitals.respiration_rate_rpm), self.config.expansion);
            let lateral = Vec3::new(e.x as f32, 1.0, e.z as f32);
            let vertical = Vec3::new(1.0, e.y as f32, 1.0);
            out.extend(self.respiratory.iter().map(|entry| {
                let factor = if entry.vertical { vertical } else { lateral };
                (entry.node, entry.base_scale * factor)
            }));
        }

        out
    }

    /// Write this frame's scales into the scene
    pub fn apply(&self, scene: &mut SceneGraph, t: f64, vitals: &VitalState) {
        for (id, scale) in self.scales_at(t, vitals) {
            if let Some(node) = scene.node_mut(id) {
                node.scale = scale;
            }
        }
    }
}
