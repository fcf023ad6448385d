//! Single-loop temperature controller core.
//!
//! This module provides [`ControlLoop`], which ties together:
//!
//! - [`QuadratureDecoder`] / [`ButtonDebouncer`] — raw encoder and button
//!   levels to ±1 steps and press events.
//! - [`ModeStateMachine`] — Running / Adjusting, committed and proposed
//!   setpoints.
//! - [`Regulator`] — PID with output clamped to `[0, output_max]`.
//!
//! # Architecture
//!
//! ```text
//!   sensor ──► Measurement ─────────────────────┐
//!                                               ▼
//!   encoder A/B ─► QuadratureDecoder ─► ModeStateMachine ─► Regulator ─► gate ─► heater
//!   button ──────► ButtonDebouncer ──┘          │                       ▲
//!                                               └──── Adjusting ─► 0 ───┘
//!                                               │
//!                                               └─► DisplayFrame (100 ms) / StatusReport (1 s)
//! ```
//!
//! # Safety Gate
//!
//! On every tick where the mode is [`Mode::Adjusting`] the actuator is
//! commanded to 0 and the regulator is not run. Adjusting never times out.
//!
//! # Ownership
//!
//! All mutable state lives in one [`ControllerState`] owned by the
//! [`ControlLoop`]. Nothing is global, so no locking is needed. If encoder
//! edges are ever moved into an interrupt handler, the step counter becomes a
//! single-producer / single-consumer boundary and needs atomic access.

mod config;
mod control_loop;
mod error;
pub mod hardware;
mod input;
mod mode;
mod regulator;

pub use config::{ControllerConfig, FaultPolicy, Gains};
pub use control_loop::{Board, ControlLoop, ControllerState, StatusReport, TickOutcome};
pub use error::{ConfigError, SensorFault};
pub use hardware::{
    ControlInputs, DisplayFrame, Measurement, PowerOutput, RawInputs, StatusDisplay,
    TemperatureSensor,
};
pub use input::{ButtonDebouncer, Press, QuadratureDecoder, Step};
pub use mode::{Mode, ModeStateMachine, SetpointRange};
pub use regulator::Regulator;

/// Lowest selectable setpoint (°C).
pub const SETPOINT_MIN: f32 = 10.0;

/// Highest selectable setpoint (°C).
pub const SETPOINT_MAX: f32 = 100.0;

/// Committed setpoint at power-on (°C).
pub const INITIAL_SETPOINT: f32 = 25.0;

/// Setpoint change per encoder step (°C).
pub const SETPOINT_STEP: f32 = 0.5;

/// Full-scale heater level (8-bit PWM).
pub const OUTPUT_MAX: u16 = 255;

/// Nominal control tick.
pub const SAMPLE_PERIOD_MS: u64 = 10;

/// Button quiet window.
pub const DEBOUNCE_MS: u64 = 200;

/// Display refresh cadence.
pub const DISPLAY_PERIOD_MS: u64 = 100;

/// Diagnostic report cadence.
pub const REPORT_PERIOD_MS: u64 = 1000;
