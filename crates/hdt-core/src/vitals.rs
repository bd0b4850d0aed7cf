//! Vital signs and the treadmill effort simulation
//!
//! Heart rate is the only independent input. Respiration, SpO2 and blood
//! pressure are derived from it synchronously whenever it changes. A 1 Hz
//! tick drives the treadmill model: speed follows heart rate, stamina drains
//! with speed, and running stops by itself on exhaustion.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Systolic/diastolic pressure in mmHg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub sys: u32,
    pub dia: u32,
}

/// The single vital-sign record shared by the UI, animation and simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalState {
    pub heart_rate_bpm: u32,
    pub respiration_rate_rpm: u32,
    pub spo2_pct: u32,
    pub blood_pressure: BloodPressure,
    pub is_running: bool,
    /// Always within `[0, 100]`
    pub stamina_pct: f64,
    pub distance_km: f64,
    pub speed_kmh: f64,
}

impl Default for VitalState {
    fn default() -> Self {
        Self {
            heart_rate_bpm: 72,
            respiration_rate_rpm: 16,
            spo2_pct: 98,
            blood_pressure: BloodPressure { sys: 120, dia: 80 },
            is_running: false,
            stamina_pct: 100.0,
            distance_km: 0.0,
            speed_kmh: 0.0,
        }
    }
}

/// Fields computed from heart rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedVitals {
    pub respiration_rate_rpm: u32,
    pub spo2_pct: u32,
    pub blood_pressure: BloodPressure,
}

/// Fixed resting-state formulas
pub fn derive_vitals(bpm: u32) -> DerivedVitals {
    let intensity = f64::from(bpm.saturating_sub(70));

    let spo2_pct = if intensity > 120.0 {
        let drop = ((intensity - 120.0) * 0.15).floor();
        (98.0 - drop).max(90.0) as u32
    } else {
        98
    };

    DerivedVitals {
        respiration_rate_rpm: (16.0 + intensity * 0.25).round() as u32,
        spo2_pct,
        blood_pressure: BloodPressure {
            sys: (120.0 + intensity * 0.4).round() as u32,
            dia: (80.0 + intensity * 0.15).round() as u32,
        },
    }
}

/// Tunables for the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsConfig {
    /// Heart-rate input is clamped into `[min_heart_rate, max_heart_rate]`
    #[serde(default = "default_min_heart_rate")]
    pub min_heart_rate: u32,
    #[serde(default = "default_max_heart_rate")]
    pub max_heart_rate: u32,
    /// Heart rate forced on exhaustion
    #[serde(default = "default_recovery_heart_rate")]
    pub recovery_heart_rate: u32,
    /// Stamina regained per idle tick
    #[serde(default = "default_stamina_recovery")]
    pub stamina_recovery_per_tick: f64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            min_heart_rate: default_min_heart_rate(),
            max_heart_rate: default_max_heart_rate(),
            recovery_heart_rate: default_recovery_heart_rate(),
            stamina_recovery_per_tick: default_stamina_recovery(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

fn default_min_heart_rate() -> u32 {
    40
}

fn default_max_heart_rate() -> u32 {
    200
}

fn default_recovery_heart_rate() -> u32 {
    110
}

fn default_stamina_recovery() -> f64 {
    2.5
}

fn default_tick_interval_ms() -> u64 {
    1000
}

const MIN_SPEED_KMH: f64 = 5.0;
const SPEED_PER_BPM: f64 = 0.18;
const SPEED_BASELINE_BPM: f64 = 75.0;
const EXHAUSTION_PER_KMH: f64 = 0.08;

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Running { speed_kmh: f64, stamina_pct: f64 },
    /// Stamina hit zero; running stopped and heart rate was forced down
    Exhausted,
    Resting { stamina_pct: f64 },
}

/// Owns the rules for mutating a [`VitalState`]
#[derive(Debug, Clone, Default)]
pub struct VitalSimEngine {
    config: VitalsConfig,
}

impl VitalSimEngine {
    pub fn new(config: VitalsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VitalsConfig {
        &self.config
    }

    /// Set heart rate (clamped) and re-derive everything that follows from it.
    /// Returns the heart rate actually stored.
    pub fn set_heart_rate(&self, state: &mut VitalState, bpm: u32) -> u32 {
        let low = self.config.min_heart_rate.max(1);
        let high = self.config.max_heart_rate.max(low);
        let bpm = bpm.clamp(low, high);
        apply_derivation(state, bpm);
        debug!(
            bpm,
            rpm = state.respiration_rate_rpm,
            spo2 = state.spo2_pct,
            sys = state.blood_pressure.sys,
            dia = state.blood_pressure.dia,
            "Heart rate updated"
        );
        bpm
    }

    /// Start the treadmill. Rejected when exhausted or already running.
    pub fn start_running(&self, state: &mut VitalState) -> bool {
        if state.is_running || state.stamina_pct <= 0.0 {
            return false;
        }
        state.is_running = true;
        info!(stamina = state.stamina_pct, "Treadmill started");
        true
    }

    pub fn stop_running(&self, state: &mut VitalState) -> bool {
        if !state.is_running {
            return false;
        }
        state.is_running = false;
        info!(distance_km = state.distance_km, "Treadmill stopped");
        true
    }

    /// One discrete simulation step
    pub fn tick(&self, state: &mut VitalState) -> TickOutcome {
        if !state.is_running {
            state.speed_kmh = 0.0;
            state.stamina_pct = (state.stamina_pct + self.config.stamina_recovery_per_tick).min(100.0);
            return TickOutcome::Resting {
                stamina_pct: state.stamina_pct,
            };
        }

        let effort = (f64::from(state.heart_rate_bpm) - SPEED_BASELINE_BPM).max(0.0);
        let speed = (effort * SPEED_PER_BPM).max(MIN_SPEED_KMH);
        state.speed_kmh = speed;
        state.distance_km += speed / 3600.0;
        state.stamina_pct = (state.stamina_pct - speed * EXHAUSTION_PER_KMH).max(0.0);

        if state.stamina_pct <= 0.0 {
            state.is_running = false;
            state.speed_kmh = 0.0;
            // Recovery bypasses the input clamp; the value is fixed by config
            apply_derivation(state, self.config.recovery_heart_rate);
            info!(
                distance_km = state.distance_km,
                bpm = state.heart_rate_bpm,
                "Exhausted, treadmill stopped"
            );
            return TickOutcome::Exhausted;
        }

        TickOutcome::Running {
            speed_kmh: speed,
            stamina_pct: state.stamina_pct,
        }
    }
}

fn apply_derivation(state: &mut VitalState, bpm: u32) {
    let derived = derive_vitals(bpm);
    state.heart_rate_bpm = bpm;
    state.respiration_rate_rpm = derived.respiration_rate_rpm;
    state.spo2_pct = derived.spo2_pct;
    state.blood_pressure = derived.blood_pressure;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_derivation_at_150() {
        let engine = VitalSimEngine::default();
        let mut state = VitalState::default();
        engine.set_heart_rate(&mut state, 150);

        assert_eq!(state.heart_rate_bpm, 150);
        assert_eq!(state.respiration_rate_rpm, 36);
        assert_eq!(state.spo2_pct, 98);
        assert_eq!(state.blood_pressure, BloodPressure { sys: 152, dia: 92 });
    }

    #[test]
    fn test_derivation_at_rest() {
        let d = derive_vitals(60);
        assert_eq!(d.respiration_rate_rpm, 16);
        assert_eq!(d.spo2_pct, 98);
        assert_eq!(d.blood_pressure, BloodPressure { sys: 120, dia: 80 });
    }

    #[test]
    fn test_spo2_floor() {
        assert_eq!(derive_vitals(190).spo2_pct, 98);
        assert_eq!(derive_vitals(200).spo2_pct, 97);
        assert_eq!(derive_vitals(300).spo2_pct, 90);
    }

    #[test]
    fn test_heart_rate_clamped() {
        let engine = VitalSimEngine::default();
        let mut state = VitalState::default();
        assert_eq!(engine.set_heart_rate(&mut state, 0), 40);
        assert_eq!(engine.set_heart_rate(&mut state, 400), 200);
        assert!(state.respiration_rate_rpm > 0);
    }

    #[test]
    fn test_running_tick() {
        let engine = VitalSimEngine::default();
        let mut state = VitalState::default();
        engine.set_heart_rate(&mut state, 129);
        assert!(engine.start_running(&mut state));

        let outcome = engine.tick(&mut state);
        assert!(matches!(outcome, TickOutcome::Running { .. }));
        assert!(approx(state.speed_kmh, 9.72));
        assert!(approx(state.stamina_pct, 100.0 - 9.72 * 0.08));
        assert!(approx(state.distance_km, 9.72 / 3600.0));
        assert!((state.distance_km - 0.0027).abs() < 1e-4);
    }

    #[test]
    fn test_minimum_speed() {
        let engine = VitalSimEngine::default();
        let mut state = VitalState::default();
        engine.start_running(&mut state);
        engine.tick(&mut state);
        assert!(approx(state.speed_kmh, 5.0));
    }

    #[test]
    fn test_exhaustion_forces_recovery() {
        let engine = VitalSimEngine::default();
        let mut state = VitalState::default();
        engine.set_heart_rate(&mut state, 180);
        engine.start_running(&mut state);
        state.stamina_pct = 0.5;

        assert_eq!(engine.tick(&mut state), TickOutcome::Exhausted);
        assert!(!state.is_running);
        assert_eq!(state.stamina_pct, 0.0);
        assert_eq!(state.speed_kmh, 0.0);
        // the final running second still counts toward distance
        assert!(state.distance_km > 0.0);
        assert_eq!(state.heart_rate_bpm, 110);
        assert_eq!(state.respiration_rate_rpm, 26);
        assert_eq!(state.spo2_pct, 98);
        assert_eq!(state.blood_pressure, BloodPressure { sys: 136, dia: 86 });

        // cannot restart while exhausted
        assert!(!engine.start_running(&mut state));
        assert!(!state.is_running);
    }

    #[test]
    fn test_resting_recovery() {
        let engine = VitalSimEngine::default();
        let mut state = VitalState {
            stamina_pct: 0.0,
            speed_kmh: 7.0,
            ..Default::default()
        };
        assert_eq!(engine.tick(&mut state), TickOutcome::Resting { stamina_pct: 2.5 });
        assert_eq!(state.speed_kmh, 0.0);
        assert!(engine.start_running(&mut state));

        let mut state = VitalState {
            stamina_pct: 99.0,
            ..Default::default()
        };
        engine.tick(&mut state);
        assert_eq!(state.stamina_pct, 100.0);
    }

    #[test]
    fn test_start_stop_idempotent() {
        let engine = VitalSimEngine::default();
        let mut state = VitalState::default();
        assert!(!engine.stop_running(&mut state));
        assert!(engine.start_running(&mut state));
        assert!(!engine.start_running(&mut state));
        assert!(engine.stop_running(&mut state));
    }
}
