//! thermoloop
//!
//! Board-agnostic core of a single-loop temperature controller: a PID
//! regulator, an operator-input mode machine that gates the heater while the
//! setpoint is being changed, and a rotary-encoder / push-button decoder.
//!
//! Everything that touches hardware sits behind the small collaborator traits
//! in [`controller::hardware`], so the whole loop runs on the host under test
//! with fake sensors, outputs and displays.
//!
//! # Crate Features
//!
//! - **`defmt`** — structured logging via [`defmt`](https://docs.rs/defmt).
//! - **`task`** — enables [`ControlLoop::run`](controller::ControlLoop::run),
//!   the never-returning loop spawned by the firmware.

#![cfg_attr(not(test), no_std)]

pub mod controller;
