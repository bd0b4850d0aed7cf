//! HDT Runtime - Model session lifecycle and the vital simulation service
//!
//! - [`ModelSession`] runs the model-ready sequence and owns one model's
//!   classification, animation rig, interaction and camera state
//! - [`VitalSimService`] is the tokio task that owns the writable vital
//!   state and ticks it at 1 Hz

pub mod service;
pub mod session;

pub use service::{RuntimeError, VitalEvent, VitalEventKind, VitalSimService};
pub use session::{LoadReport, ModelSession, SessionConfig};
