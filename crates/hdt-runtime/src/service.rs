//! Vital simulation service
//!
//! A single task owns the writable [`VitalState`]. Commands and timer ticks
//! are serialized through one `select!` loop, so a tick always sees the
//! result of every command received before it. Readers get the latest state
//! from a `watch` channel and changes from a broadcast of [`VitalEvent`]s.

use chrono::{DateTime, Utc};
use hdt_core::vitals::{TickOutcome, VitalSimEngine, VitalState, VitalsConfig};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Vital simulation service has stopped")]
    ServiceStopped,
    #[error("Vital simulation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What changed in the vital state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VitalEventKind {
    HeartRateChanged { bpm: u32 },
    RunningStarted,
    RunningStopped { distance_km: f64 },
    Tick { speed_kmh: f64, stamina_pct: f64, distance_km: f64 },
    Exhausted { heart_rate_bpm: u32 },
    Recovering { stamina_pct: f64 },
}

/// Timestamped event sent to subscribers
#[derive(Debug, Clone, Serialize)]
pub struct VitalEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: VitalEventKind,
}

impl VitalEvent {
    fn now(kind: VitalEventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }
}

enum Command {
    SetHeartRate { bpm: u32, reply: oneshot::Sender<u32> },
    StartRunning { reply: oneshot::Sender<bool> },
    StopRunning { reply: oneshot::Sender<bool> },
    Shutdown,
}

/// Handle to the running simulation task
pub struct VitalSimService {
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<VitalState>,
    event_tx: broadcast::Sender<VitalEvent>,
    handle: JoinHandle<VitalState>,
}

impl VitalSimService {
    /// Spawn with default initial vitals. Must be called within a tokio runtime.
    pub fn spawn(config: VitalsConfig) -> Self {
        Self::spawn_with_state(config, VitalState::default())
    }

    pub fn spawn_with_state(config: VitalsConfig, initial: VitalState) -> Self {
        let (commands, command_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(initial.clone());
        let (event_tx, _) = broadcast::channel(100);

        let period = Duration::from_millis(config.tick_interval_ms.max(1));
        let engine = VitalSimEngine::new(config);
        let task = SimTask {
            engine,
            state: initial,
            state_tx,
            event_tx: event_tx.clone(),
        };
        let handle = tokio::spawn(task.run(command_rx, period));
        info!(period_ms = period.as_millis() as u64, "Vital simulation started");

        Self {
            commands,
            state_rx,
            event_tx,
            handle,
        }
    }

    /// Latest published state
    pub fn state(&self) -> VitalState {
        self.state_rx.borrow().clone()
    }

    /// Read-only view for the render path
    pub fn watch(&self) -> watch::Receiver<VitalState> {
        self.state_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VitalEvent> {
        self.event_tx.subscribe()
    }

    /// Returns the clamped heart rate actually stored
    pub async fn set_heart_rate(&self, bpm: u32) -> Result<u32, RuntimeError> {
        self.request(|reply| Command::SetHeartRate { bpm, reply }).await
    }

    pub async fn start_running(&self) -> Result<bool, RuntimeError> {
        self.request(|reply| Command::StartRunning { reply }).await
    }

    pub async fn stop_running(&self) -> Result<bool, RuntimeError> {
        self.request(|reply| Command::StopRunning { reply }).await
    }

    /// Stop the timer and wait for the task. Returns the final state.
    pub async fn shutdown(self) -> Result<VitalState, RuntimeError> {
        if self.commands.send(Command::Shutdown).await.is_err() {
            warn!("Vital simulation task already gone");
        }
        let state = self.handle.await?;
        info!("Vital simulation stopped");
        Ok(state)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| RuntimeError::ServiceStopped)?;
        rx.await.map_err(|_| RuntimeError::ServiceStopped)
    }
}

struct SimTask {
    engine: VitalSimEngine,
    state: VitalState,
    state_tx: watch::Sender<VitalState>,
    event_tx: broadcast::Sender<VitalEvent>,
}

impl SimTask {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, period: Duration) -> VitalState {
        // First tick one full period after start
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                _ = ticker.tick() => self.tick(),
            }
            self.state_tx.send_replace(self.state.clone());
        }

        self.state
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::SetHeartRate { bpm, reply } => {
                let stored = self.engine.set_heart_rate(&mut self.state, bpm);
                self.emit(VitalEventKind::HeartRateChanged { bpm: stored });
                let _ = reply.send(stored);
            }
            Command::StartRunning { reply } => {
                let started = self.engine.start_running(&mut self.state);
                if started {
                    self.emit(VitalEventKind::RunningStarted);
                }
                let _ = reply.send(started);
            }
            Command::StopRunning { reply } => {
                let stopped = self.engine.stop_running(&mut self.state);
                if stopped {
                    self.emit(VitalEventKind::RunningStopped {
                        distance_km: self.state.distance_km,
                    });
                }
                let _ = reply.send(stopped);
            }
            Command::Shutdown => {}
        }
    }

    fn tick(&mut self) {
        let before = self.state.stamina_pct;
        match self.engine.tick(&mut self.state) {
            TickOutcome::Running { speed_kmh, stamina_pct } => {
                self.emit(VitalEventKind::Tick {
                    speed_kmh,
                    stamina_pct,
                    distance_km: self.state.distance_km,
                });
            }
            TickOutcome::Exhausted => {
                self.emit(VitalEventKind::Exhausted {
                    heart_rate_bpm: self.state.heart_rate_bpm,
                });
            }
            TickOutcome::Resting { stamina_pct } if stamina_pct != before => {
                self.emit(VitalEventKind::Recovering { stamina_pct });
            }
            TickOutcome::Resting { .. } => {}
        }
    }

    fn emit(&self, kind: VitalEventKind) {
        debug!(?kind, "Vital event");
        // No subscribers is fine
        let _ = self.event_tx.send(VitalEvent::now(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn drain(rx: &mut broadcast::Receiver<VitalEvent>) -> Vec<VitalEventKind> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event.kind);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_publish_state() {
        let service = VitalSimService::spawn(VitalsConfig::default());
        let mut events = service.subscribe();

        assert_eq!(service.set_heart_rate(150).await.unwrap(), 150);
        sleep(Duration::from_millis(10)).await;
        let state = service.state();
        assert_eq!(state.respiration_rate_rpm, 36);
        assert_eq!(state.spo2_pct, 98);

        assert_eq!(service.set_heart_rate(500).await.unwrap(), 200);
        let events = drain(&mut events);
        assert_eq!(events[0], VitalEventKind::HeartRateChanged { bpm: 150 });
        assert_eq!(events[1], VitalEventKind::HeartRateChanged { bpm: 200 });

        service.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_reads_latest_state() {
        let service = VitalSimService::spawn(VitalsConfig::default());
        let watch = service.watch();

        service.set_heart_rate(129).await.unwrap();
        assert!(service.start_running().await.unwrap());
        assert!(!service.start_running().await.unwrap());

        sleep(Duration::from_millis(1500)).await;
        let state = watch.borrow().clone();
        assert!(state.is_running);
        assert!((state.speed_kmh - 9.72).abs() < 1e-9);
        assert!((state.distance_km - 9.72 / 3600.0).abs() < 1e-9);

        assert!(service.stop_running().await.unwrap());
        let final_state = service.shutdown().await.unwrap();
        assert!(!final_state.is_running);
        assert!(final_state.distance_km > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_stops_running() {
        let service = VitalSimService::spawn(VitalsConfig::default());
        let mut events = service.subscribe();

        service.set_heart_rate(200).await.unwrap();
        service.start_running().await.unwrap();

        // 22.5 km/h drains 1.8 stamina per tick
        sleep(Duration::from_millis(56_500)).await;
        let state = service.state();
        assert!(!state.is_running);
        assert_eq!(state.heart_rate_bpm, 110);
        assert_eq!(state.respiration_rate_rpm, 26);
        assert_eq!(state.stamina_pct, 0.0);

        let events = drain(&mut events);
        assert!(events.contains(&VitalEventKind::Exhausted { heart_rate_bpm: 110 }));

        // exhausted, so start is rejected until stamina recovers
        assert!(!service.start_running().await.unwrap());
        sleep(Duration::from_millis(1000)).await;
        assert!(service.start_running().await.unwrap());

        service.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_recovery_only_reports_changes() {
        let initial = VitalState {
            stamina_pct: 97.5,
            ..Default::default()
        };
        let service = VitalSimService::spawn_with_state(VitalsConfig::default(), initial);
        let mut events = service.subscribe();

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(service.state().stamina_pct, 100.0);
        assert_eq!(
            drain(&mut events),
            vec![VitalEventKind::Recovering { stamina_pct: 100.0 }]
        );

        service.shutdown().await.unwrap();
    }
}
