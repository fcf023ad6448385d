use core::fmt;

/// Errors reported when a [`ControllerConfig`](super::ControllerConfig) is
/// rejected at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A gain is negative or not finite.
    InvalidGains,
    /// `setpoint_min` is not strictly below `setpoint_max`, or a bound is not finite.
    InvalidSetpointRange,
    /// `initial_setpoint` lies outside `[setpoint_min, setpoint_max]`.
    InitialSetpointOutOfRange,
    /// `setpoint_step` is zero, negative or not finite.
    InvalidSetpointStep,
    /// `output_max` is zero.
    InvalidOutputMax,
    /// `integral_limit` is set but negative or not finite.
    InvalidIntegralLimit,
    /// A period or window is zero.
    ZeroPeriod,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::InvalidGains => write!(f, "gains must be finite and non-negative"),
            ConfigError::InvalidSetpointRange => write!(f, "setpoint range must satisfy min < max"),
            ConfigError::InitialSetpointOutOfRange => {
                write!(f, "initial setpoint outside the setpoint range")
            }
            ConfigError::InvalidSetpointStep => write!(f, "setpoint step must be positive"),
            ConfigError::InvalidOutputMax => write!(f, "output maximum must be non-zero"),
            ConfigError::InvalidIntegralLimit => {
                write!(f, "integral limit must be finite and non-negative")
            }
            ConfigError::ZeroPeriod => write!(f, "periods must be non-zero"),
        }
    }
}

/// A failed temperature read.
///
/// The control loop treats every variant the same way: regulation is skipped
/// for the tick, the fault is shown on the display and the read is retried on
/// the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorFault {
    /// Nothing answered on the sensor bus.
    Disconnected,
    /// The sensor answered but the data failed its integrity check.
    Corrupt,
    /// The reading is outside the sensor's physical range or not finite.
    OutOfRange,
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SensorFault::Disconnected => write!(f, "sensor disconnected"),
            SensorFault::Corrupt => write!(f, "sensor data corrupt"),
            SensorFault::OutOfRange => write!(f, "sensor reading out of range"),
        }
    }
}
