//! Collaborator traits the control loop is generic over.
//!
//! Each target board provides one implementation of each trait; tests use
//! in-memory fakes. Sensor and display access is async so a bus transfer
//! yields to the executor instead of spinning.

use super::error::SensorFault;
use super::mode::Mode;

/// Temperature source.
#[allow(async_fn_in_trait)]
pub trait TemperatureSensor {
    /// Read the current temperature in °C.
    ///
    /// Must complete in bounded time; a missing or faulty sensor is reported
    /// as an error, never by blocking.
    async fn read_temperature(&mut self) -> Result<f32, SensorFault>;
}

/// Proportional power actuator (heater behind a duty-cycled switch).
pub trait PowerOutput {
    /// Command a level in `[0, output_max]`. Idempotent and infallible.
    fn set_output(&mut self, level: u16);
}

/// Status display.
#[allow(async_fn_in_trait)]
pub trait StatusDisplay {
    type Error: core::fmt::Debug;

    /// Show one frame. Failures are logged by the loop and otherwise ignored.
    async fn render(&mut self, frame: &DisplayFrame) -> Result<(), Self::Error>;
}

/// Raw operator input pins.
pub trait ControlInputs {
    fn sample(&mut self) -> RawInputs;
}

/// One sample of the operator input pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawInputs {
    /// Encoder channel A (primary) level.
    pub encoder_a: bool,
    /// Encoder channel B (secondary) level.
    pub encoder_b: bool,
    /// Raw button level. Active-low: `false` while held.
    pub button_high: bool,
}

impl Default for RawInputs {
    /// Idle pull-ups: every line high.
    fn default() -> Self {
        Self {
            encoder_a: true,
            encoder_b: true,
            button_high: true,
        }
    }
}

/// Result of one sensor read as seen by the rest of the loop.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Measurement {
    /// A finite temperature in °C.
    Celsius(f32),
    /// The read failed or produced a non-finite value.
    Fault(SensorFault),
}

impl Measurement {
    /// Normalise a raw sensor result. Non-finite values become
    /// [`SensorFault::OutOfRange`].
    pub fn from_reading(reading: Result<f32, SensorFault>) -> Self {
        match reading {
            Ok(t) if t.is_finite() => Measurement::Celsius(t),
            Ok(_) => Measurement::Fault(SensorFault::OutOfRange),
            Err(fault) => Measurement::Fault(fault),
        }
    }

    pub fn celsius(&self) -> Option<f32> {
        match self {
            Measurement::Celsius(t) => Some(*t),
            Measurement::Fault(_) => None,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Measurement::Fault(_))
    }
}

/// Everything the display needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayFrame {
    pub mode: Mode,
    pub measurement: Measurement,
    /// Committed setpoint while running, proposed setpoint while adjusting.
    pub setpoint: f32,
    /// Last commanded actuator level.
    pub output: u16,
    /// Full-scale actuator level, for percentage display.
    pub output_max: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_reading_is_valid() {
        assert_eq!(
            Measurement::from_reading(Ok(21.5)),
            Measurement::Celsius(21.5)
        );
        assert_eq!(Measurement::Celsius(21.5).celsius(), Some(21.5));
    }

    #[test]
    fn non_finite_reading_is_fault() {
        assert_eq!(
            Measurement::from_reading(Ok(f32::NAN)),
            Measurement::Fault(SensorFault::OutOfRange)
        );
        assert!(Measurement::from_reading(Ok(f32::INFINITY)).is_fault());
    }

    #[test]
    fn error_reading_keeps_fault_kind() {
        let m = Measurement::from_reading(Err(SensorFault::Disconnected));
        assert_eq!(m, Measurement::Fault(SensorFault::Disconnected));
        assert_eq!(m.celsius(), None);
    }

    #[test]
    fn idle_inputs_are_high() {
        let raw = RawInputs::default();
        assert!(raw.encoder_a && raw.encoder_b && raw.button_high);
    }
}
