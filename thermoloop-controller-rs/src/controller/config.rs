//! Controller configuration.
//!
//! All tunables live in [`ControllerConfig`]; there are no hidden module
//! constants inside the loop. [`ControllerConfig::default()`] reproduces the
//! reference apparatus (10–100 °C, 0.5 °C per detent, 8-bit heater output).

use embassy_time::Duration;

use super::error::ConfigError;
use super::{
    DEBOUNCE_MS, DISPLAY_PERIOD_MS, INITIAL_SETPOINT, OUTPUT_MAX, REPORT_PERIOD_MS,
    SAMPLE_PERIOD_MS, SETPOINT_MAX, SETPOINT_MIN, SETPOINT_STEP,
};

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gains {
    /// Proportional gain (Kp).
    pub kp: f32,
    /// Integral gain (Ki), applied to the error integrated over seconds.
    pub ki: f32,
    /// Derivative gain (Kd), applied to the error slope per second.
    pub kd: f32,
}

impl Gains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    /// `true` when every gain is finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [self.kp, self.ki, self.kd]
            .iter()
            .all(|g| g.is_finite() && *g >= 0.0)
    }
}

impl Default for Gains {
    fn default() -> Self {
        Self::new(2.0, 0.5, 1.0)
    }
}

/// What the loop commands on a tick whose sensor read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultPolicy {
    /// Command 0 on every fault tick.
    #[default]
    ForceOff,
    /// Send no command; the actuator keeps its last explicitly commanded level.
    HoldLast,
}

/// Complete configuration for a [`ControlLoop`](super::ControlLoop).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerConfig {
    /// Lowest selectable setpoint in °C (inclusive).
    pub setpoint_min: f32,
    /// Highest selectable setpoint in °C (inclusive).
    pub setpoint_max: f32,
    /// Committed setpoint at power-on.
    pub initial_setpoint: f32,
    /// Setpoint change per encoder step while adjusting.
    pub setpoint_step: f32,
    /// Regulator gains at power-on.
    pub gains: Gains,
    /// Full-scale actuator level. Regulator output is clamped to `[0, output_max]`.
    pub output_max: u16,
    /// Optional symmetric clamp on the integral accumulator. `None` keeps the
    /// unclamped baseline behaviour.
    pub integral_limit: Option<f32>,
    /// Nominal tick period, used as `dt` when no elapsed time is available and
    /// as the end-of-tick pause in [`ControlLoop::run`](super::ControlLoop::run).
    pub sample_period: Duration,
    /// Quiet window after an accepted button change.
    pub debounce: Duration,
    /// Display refresh cadence.
    pub display_period: Duration,
    /// Diagnostic report cadence.
    pub report_period: Duration,
    /// Actuator behaviour on sensor-fault ticks.
    pub fault_policy: FaultPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            setpoint_min: SETPOINT_MIN,
            setpoint_max: SETPOINT_MAX,
            initial_setpoint: INITIAL_SETPOINT,
            setpoint_step: SETPOINT_STEP,
            gains: Gains::default(),
            output_max: OUTPUT_MAX,
            integral_limit: None,
            sample_period: Duration::from_millis(SAMPLE_PERIOD_MS),
            debounce: Duration::from_millis(DEBOUNCE_MS),
            display_period: Duration::from_millis(DISPLAY_PERIOD_MS),
            report_period: Duration::from_millis(REPORT_PERIOD_MS),
            fault_policy: FaultPolicy::ForceOff,
        }
    }
}

impl ControllerConfig {
    /// Check every field, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gains.is_valid() {
            return Err(ConfigError::InvalidGains);
        }
        if !(self.setpoint_min.is_finite()
            && self.setpoint_max.is_finite()
            && self.setpoint_min < self.setpoint_max)
        {
            return Err(ConfigError::InvalidSetpointRange);
        }
        if !(self.setpoint_min..=self.setpoint_max).contains(&self.initial_setpoint) {
            return Err(ConfigError::InitialSetpointOutOfRange);
        }
        if !(self.setpoint_step.is_finite() && self.setpoint_step > 0.0) {
            return Err(ConfigError::InvalidSetpointStep);
        }
        if self.output_max == 0 {
            return Err(ConfigError::InvalidOutputMax);
        }
        if let Some(limit) = self.integral_limit {
            if !(limit.is_finite() && limit >= 0.0) {
                return Err(ConfigError::InvalidIntegralLimit);
            }
        }
        let zero = Duration::from_ticks(0);
        if [
            self.sample_period,
            self.debounce,
            self.display_period,
            self.report_period,
        ]
        .contains(&zero)
        {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let c = ControllerConfig::default();
        assert_eq!(c.validate(), Ok(()));
        assert_eq!(c.setpoint_min, 10.0);
        assert_eq!(c.setpoint_max, 100.0);
        assert_eq!(c.setpoint_step, 0.5);
        assert_eq!(c.output_max, 255);
        assert_eq!(c.debounce.as_millis(), 200);
        assert_eq!(c.display_period.as_millis(), 100);
        assert_eq!(c.report_period.as_millis(), 1000);
        assert!(c.integral_limit.is_none());
        assert_eq!(c.fault_policy, FaultPolicy::ForceOff);
    }

    #[test]
    fn negative_gain_rejected() {
        let c = ControllerConfig {
            gains: Gains::new(1.0, -0.1, 0.0),
            ..ControllerConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::InvalidGains));
    }

    #[test]
    fn nan_gain_rejected() {
        let c = ControllerConfig {
            gains: Gains::new(f32::NAN, 0.0, 0.0),
            ..ControllerConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::InvalidGains));
    }

    #[test]
    fn inverted_range_rejected() {
        let c = ControllerConfig {
            setpoint_min: 50.0,
            setpoint_max: 50.0,
            initial_setpoint: 50.0,
            ..ControllerConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::InvalidSetpointRange));
    }

    #[test]
    fn initial_setpoint_outside_range_rejected() {
        let c = ControllerConfig {
            initial_setpoint: 5.0,
            ..ControllerConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::InitialSetpointOutOfRange));
    }

    #[test]
    fn zero_step_rejected() {
        let c = ControllerConfig {
            setpoint_step: 0.0,
            ..ControllerConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::InvalidSetpointStep));
    }

    #[test]
    fn zero_output_max_rejected() {
        let c = ControllerConfig {
            output_max: 0,
            ..ControllerConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::InvalidOutputMax));
    }

    #[test]
    fn negative_integral_limit_rejected() {
        let c = ControllerConfig {
            integral_limit: Some(-1.0),
            ..ControllerConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::InvalidIntegralLimit));
    }

    #[test]
    fn zero_debounce_rejected() {
        let c = ControllerConfig {
            debounce: Duration::from_millis(0),
            ..ControllerConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::ZeroPeriod));
    }
}
