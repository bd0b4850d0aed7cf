//! One-time anatomical tinting of materials

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::rules::Tint;
use crate::scene::{Color, Material, MaterialId, SceneGraph};

/// Non-metallic matte finish applied to tinted materials
pub const TINT_METALNESS: f32 = 0.0;
pub const TINT_ROUGHNESS: f32 = 0.7;

/// Channels above this count as "blown-out white"
pub const WHITE_THRESHOLD: f32 = 0.95;

/// Fallback for untextured white geometry nobody classified
pub const NEUTRAL_GREY: Color = Color::rgb(0.55, 0.55, 0.58);

/// What one color pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorStats {
    pub tinted: usize,
    pub preserved: usize,
    pub greyed: usize,
    pub untouched: usize,
}

/// Paints every distinct material once per loaded model
#[derive(Debug, Default)]
pub struct ColorMapper {
    applied: bool,
}

impl ColorMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Run the pass. Returns `None` when it already ran for this model.
    pub fn apply(&mut self, scene: &mut SceneGraph, palette: &HashMap<&str, Tint>) -> Option<ColorStats> {
        if self.applied {
            debug!("Color pass already applied, skipping");
            return None;
        }

        // Dedup by identity: two materials may share a name but not an id
        let mut seen: HashSet<MaterialId> = HashSet::new();
        let ordered: Vec<MaterialId> = scene
            .meshes()
            .flat_map(|(_, node)| node.kind.materials().iter().copied())
            .filter(|id| seen.insert(*id))
            .collect();

        let mut stats = ColorStats::default();
        for id in ordered {
            let Some(material) = scene.material_mut(id) else {
                continue;
            };
            match palette.get(material.name.as_str()) {
                Some(Tint::Color(color)) => {
                    paint(material, *color);
                    stats.tinted += 1;
                }
                Some(Tint::Preserve) => stats.preserved += 1,
                None if material.base_color.all_above(WHITE_THRESHOLD) => {
                    material.base_color = NEUTRAL_GREY;
                    material.maps.clear();
                    stats.greyed += 1;
                }
                None => stats.untouched += 1,
            }
        }

        self.applied = true;
        debug!(
            tinted = stats.tinted,
            preserved = stats.preserved,
            greyed = stats.greyed,
            untouched = stats.untouched,
            "Color pass complete"
        );
        Some(stats)
    }
}

fn paint(material: &mut Material, color: Color) {
    material.base_color = color;
    material.maps.clear();
    material.metalness = TINT_METALNESS;
    material.roughness = TINT_ROUGHNESS;
    material.emissive = Color::BLACK;
}
