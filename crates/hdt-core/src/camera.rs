//! Focus tween toward a selected part

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::search::SearchablePart;

pub const DEFAULT_EYE: Vec3 = Vec3::new(0.0, 0.5, 3.0);
pub const DEFAULT_LOOK_AT: Vec3 = Vec3::new(0.0, 0.5, 0.0);

const LERP_FACTOR: f32 = 0.06;
const SETTLE_DISTANCE: f32 = 0.01;
const MIN_DISTANCE: f32 = 0.4;
const DISTANCE_FACTOR: f32 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRig {
    pub eye: Vec3,
    pub look_at: Vec3,
    target_eye: Vec3,
    target_look_at: Vec3,
    animating: bool,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            eye: DEFAULT_EYE,
            look_at: DEFAULT_LOOK_AT,
            target_eye: DEFAULT_EYE,
            target_look_at: DEFAULT_LOOK_AT,
            animating: false,
        }
    }
}

impl CameraRig {
    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// Start easing toward `part`. Parts without bounds are ignored.
    pub fn focus_on(&mut self, part: &SearchablePart) -> bool {
        let Some(target) = part.camera_target else {
            return false;
        };
        let distance = (part.camera_distance * DISTANCE_FACTOR).max(MIN_DISTANCE);
        self.target_look_at = target;
        self.target_eye = target + Vec3::new(0.0, 0.0, distance);
        self.animating = true;
        true
    }

    /// Ease back to the default framing
    pub fn reset(&mut self) {
        self.target_eye = DEFAULT_EYE;
        self.target_look_at = DEFAULT_LOOK_AT;
        self.animating = true;
    }

    /// Advance one frame. Returns whether the camera is still moving.
    pub fn step(&mut self) -> bool {
        if !self.animating {
            return false;
        }
        self.eye = self.eye.lerp(self.target_eye, LERP_FACTOR);
        self.look_at = self.look_at.lerp(self.target_look_at, LERP_FACTOR);

        if self.eye.distance(self.target_eye) < SETTLE_DISTANCE
            && self.look_at.distance(self.target_look_at) < SETTLE_DISTANCE
        {
            self.animating = false;
        }
        self.animating
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeId;
    use crate::systems::SystemKey;

    fn part(target: Option<Vec3>, distance: f32) -> SearchablePart {
        SearchablePart {
            id: NodeId(1),
            name: "Heart".into(),
            original_name: "Heart".into(),
            system: SystemKey::Cardiovascular,
            camera_target: target,
            camera_distance: distance,
        }
    }

    #[test]
    fn test_focus_and_settle() {
        let mut rig = CameraRig::default();
        assert!(rig.focus_on(&part(Some(Vec3::new(0.0, 1.2, 0.1)), 0.5)));
        assert!(rig.is_animating());

        let mut frames = 0;
        while rig.step() {
            frames += 1;
            assert!(frames < 1000);
        }
        assert!(rig.look_at.distance(Vec3::new(0.0, 1.2, 0.1)) < 0.01);
        assert!(rig.eye.distance(Vec3::new(0.0, 1.2, 1.6)) < 0.01);
    }

    #[test]
    fn test_minimum_distance() {
        let mut rig = CameraRig::default();
        rig.focus_on(&part(Some(Vec3::ZERO), 0.01));
        while rig.step() {}
        assert!((rig.eye.z - 0.4).abs() < 0.01);
    }

    #[test]
    fn test_part_without_bounds_ignored() {
        let mut rig = CameraRig::default();
        assert!(!rig.focus_on(&part(None, 1.0)));
        assert!(!rig.step());
        assert_eq!(rig.eye, DEFAULT_EYE);
    }
}
