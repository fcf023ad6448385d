//! The control loop.
//!
//! [`ControlLoop`] owns the [`ControllerState`] and the board collaborators
//! and advances everything by one [`tick`](ControlLoop::tick) at a time:
//!
//! 1. Read the sensor. A fault skips regulation for this tick only.
//! 2. Sample the encoder and button, feed steps and presses to the mode
//!    machine.
//! 3. Running with a valid reading: run the regulator and command its output.
//! 4. Adjusting: command 0, whatever the regulator would have said.
//! 5. Refresh the display when its period has elapsed.
//! 6. Produce a [`StatusReport`] when the report period has elapsed.
//!
//! Cadences compare the tick timestamp against the last event; nothing in a
//! tick sleeps.

use core::fmt;

use embassy_time::{Duration, Instant};

use super::config::{ControllerConfig, FaultPolicy};
use super::error::ConfigError;
use super::hardware::{
    ControlInputs, DisplayFrame, Measurement, PowerOutput, RawInputs, StatusDisplay,
    TemperatureSensor,
};
use super::input::{ButtonDebouncer, QuadratureDecoder};
use super::mode::{Mode, ModeStateMachine, SetpointRange};
use super::regulator::Regulator;

/// The collaborators a [`ControlLoop`] drives.
pub struct Board<S, P, D, I> {
    pub sensor: S,
    pub power: P,
    pub display: D,
    pub inputs: I,
}

/// All mutable controller state, owned by exactly one [`ControlLoop`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerState {
    modes: ModeStateMachine,
    regulator: Regulator,
    decoder: QuadratureDecoder,
    button: ButtonDebouncer,
    /// Last level actually sent to the actuator.
    output: u16,
    measurement: Option<Measurement>,
    fault_streak: u32,
    last_tick: Option<Instant>,
    last_render: Option<Instant>,
    last_report: Option<Instant>,
}

impl ControllerState {
    /// Build the power-on state from a validated config and the input pin
    /// levels at start-up.
    pub fn new(config: &ControllerConfig, initial: RawInputs) -> Result<Self, ConfigError> {
        config.validate()?;

        let range = SetpointRange {
            min: config.setpoint_min,
            max: config.setpoint_max,
        };
        let mut regulator = Regulator::new(config.gains, config.output_max as f32);
        if let Some(limit) = config.integral_limit {
            regulator = regulator.with_integral_limit(limit);
        }

        Ok(Self {
            modes: ModeStateMachine::new(config.initial_setpoint, range, config.setpoint_step),
            regulator,
            decoder: QuadratureDecoder::new(initial.encoder_a),
            button: ButtonDebouncer::new(config.debounce),
            output: 0,
            measurement: None,
            fault_streak: 0,
            last_tick: None,
            last_render: None,
            last_report: None,
        })
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn modes(&self) -> &ModeStateMachine {
        &self.modes
    }

    pub fn regulator(&self) -> &Regulator {
        &self.regulator
    }

    /// Diagnostic encoder position.
    pub fn encoder_position(&self) -> i32 {
        self.decoder.position()
    }

    pub fn output(&self) -> u16 {
        self.output
    }

    /// Most recent measurement, `None` before the first tick.
    pub fn measurement(&self) -> Option<Measurement> {
        self.measurement
    }

    /// Consecutive ticks with a failed sensor read.
    pub fn fault_streak(&self) -> u32 {
        self.fault_streak
    }

    fn record_measurement(&mut self, measurement: Measurement) {
        match measurement {
            Measurement::Fault(_fault) => {
                if self.fault_streak == 0 {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Sensor fault: {}", _fault);
                }
                self.fault_streak = self.fault_streak.saturating_add(1);
            }
            Measurement::Celsius(_) => {
                if self.fault_streak > 0 {
                    #[cfg(feature = "defmt")]
                    defmt::info!("Sensor recovered after {} ticks", self.fault_streak);
                }
                self.fault_streak = 0;
            }
        }
        self.measurement = Some(measurement);
    }

    /// Run the decoders on one input sample and feed the mode machine.
    fn apply_inputs(&mut self, raw: RawInputs, now: Instant) {
        if let Some(step) = self.decoder.update(raw.encoder_a, raw.encoder_b) {
            self.modes.on_step(step);
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "Encoder {}: position={}",
                step,
                self.decoder.position()
            );
        }
        if self.button.update(raw.button_high, now).is_some() {
            self.modes.on_press();
        }
    }

    fn frame(&self, output_max: u16) -> DisplayFrame {
        DisplayFrame {
            mode: self.modes.mode(),
            measurement: self
                .measurement
                .unwrap_or(Measurement::Fault(super::SensorFault::Disconnected)),
            setpoint: self.modes.displayed_setpoint(),
            output: self.output,
            output_max,
        }
    }
}

/// Periodic diagnostic snapshot. Observational only.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusReport {
    pub mode: Mode,
    pub measurement: Measurement,
    /// Committed setpoint.
    pub setpoint: f32,
    pub output: u16,
    pub encoder_position: i32,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.measurement {
            Measurement::Celsius(t) => write!(f, "T={:.2}C", t)?,
            Measurement::Fault(fault) => write!(f, "T=FAULT({})", fault)?,
        }
        let mode = match self.mode {
            Mode::Running => "RUN",
            Mode::Adjusting => "ADJ",
        };
        write!(
            f,
            " SP={:.1}C OUT={} {} pos={}",
            self.setpoint, self.output, mode, self.encoder_position
        )
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub mode: Mode,
    pub measurement: Measurement,
    /// Level sent to the actuator this tick, `None` if nothing was sent.
    pub command: Option<u16>,
    /// `true` if the display was asked to render this tick.
    pub rendered: bool,
    pub report: Option<StatusReport>,
}

/// Single-loop temperature controller.
pub struct ControlLoop<S, P, D, I> {
    config: ControllerConfig,
    state: ControllerState,
    board: Board<S, P, D, I>,
}

impl<S, P, D, I> ControlLoop<S, P, D, I>
where
    S: TemperatureSensor,
    P: PowerOutput,
    D: StatusDisplay,
    I: ControlInputs,
{
    /// Validate `config`, take the start-up input sample and switch the
    /// actuator off.
    pub fn new(config: ControllerConfig, mut board: Board<S, P, D, I>) -> Result<Self, ConfigError> {
        let initial = board.inputs.sample();
        let state = ControllerState::new(&config, initial)?;
        board.power.set_output(0);

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Controller ready: setpoint {} in [{}, {}]",
            config.initial_setpoint,
            config.setpoint_min,
            config.setpoint_max
        );

        Ok(Self {
            config,
            state,
            board,
        })
    }

    /// Advance the controller by one tick stamped `now`.
    ///
    /// `now` must come from a monotonic clock.
    pub async fn tick(&mut self, now: Instant) -> TickOutcome {
        let dt = self.elapsed_since_last_tick(now);
        self.state.last_tick = Some(now);

        // 1. Sensor.
        let measurement = Measurement::from_reading(self.board.sensor.read_temperature().await);
        self.state.record_measurement(measurement);

        // 2. Operator input.
        let raw = self.board.inputs.sample();
        self.state.apply_inputs(raw, now);

        // 3 + 4. Regulate and gate.
        let command = match (self.state.modes.mode(), measurement) {
            (Mode::Adjusting, _) => Some(0),
            (Mode::Running, Measurement::Celsius(t)) => {
                let secs = dt.as_micros() as f32 / 1_000_000.0;
                let out = self
                    .state
                    .regulator
                    .compute(self.state.modes.setpoint(), t, secs);
                Some(out as u16)
            }
            (Mode::Running, Measurement::Fault(_)) => match self.config.fault_policy {
                FaultPolicy::ForceOff => Some(0),
                FaultPolicy::HoldLast => None,
            },
        };
        if let Some(level) = command {
            self.board.power.set_output(level);
            self.state.output = level;
        }

        // 5. Display.
        let rendered = is_due(self.state.last_render, now, self.config.display_period);
        if rendered {
            self.state.last_render = Some(now);
            let frame = self.state.frame(self.config.output_max);
            if let Err(_e) = self.board.display.render(&frame).await {
                #[cfg(feature = "defmt")]
                defmt::error!("Display render failed");
            }
        }

        // 6. Diagnostics.
        let report = if is_due(self.state.last_report, now, self.config.report_period) {
            self.state.last_report = Some(now);
            Some(StatusReport {
                mode: self.state.modes.mode(),
                measurement,
                setpoint: self.state.modes.setpoint(),
                output: self.state.output,
                encoder_position: self.state.decoder.position(),
            })
        } else {
            None
        };

        TickOutcome {
            mode: self.state.modes.mode(),
            measurement,
            command,
            rendered,
            report,
        }
    }

    /// Run forever: tick, log the status report, pause for the nominal period.
    #[cfg(feature = "task")]
    pub async fn run(mut self) -> ! {
        loop {
            let outcome = self.tick(Instant::now()).await;
            if let Some(_report) = outcome.report {
                #[cfg(feature = "defmt")]
                defmt::info!(
                    "status: {} setpoint={} output={} mode={} pos={}",
                    _report.measurement,
                    _report.setpoint,
                    _report.output,
                    _report.mode,
                    _report.encoder_position
                );
            }
            embassy_time::Timer::after(self.config.sample_period).await;
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Retune the regulator between ticks without touching its state.
    pub fn set_gains(&mut self, gains: super::Gains) -> Result<(), ConfigError> {
        if !gains.is_valid() {
            return Err(ConfigError::InvalidGains);
        }
        self.state.regulator.set_gains(gains);
        self.config.gains = gains;
        Ok(())
    }

    pub fn board(&self) -> &Board<S, P, D, I> {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board<S, P, D, I> {
        &mut self.board
    }

    /// Elapsed time since the previous tick, or the nominal period on the
    /// first tick and whenever the clock has not advanced.
    fn elapsed_since_last_tick(&self, now: Instant) -> Duration {
        self.state
            .last_tick
            .and_then(|prev| now.checked_duration_since(prev))
            .filter(|d| d.as_ticks() > 0)
            .unwrap_or(self.config.sample_period)
    }
}

fn is_due(last: Option<Instant>, now: Instant, period: Duration) -> bool {
    match last {
        None => true,
        Some(last) => now
            .checked_duration_since(last)
            .is_some_and(|elapsed| elapsed >= period),
    }
}
