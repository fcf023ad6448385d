//! PID regulator.
//!
//! Positional PID with the output clamped to `[0, output_max]`. The integral
//! accumulator is left unclamped unless an `integral_limit` is configured;
//! with no limit, a long saturated stretch winds the integral up and delays
//! recovery once the error changes sign.

use super::config::Gains;

/// PID regulator owning its integral and previous-error state.
///
/// Performs no I/O and cannot fail. Callers must only pass finite values.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Regulator {
    gains: Gains,
    output_max: f32,
    integral_limit: Option<f32>,
    integral: f32,
    previous_error: f32,
}

impl Regulator {
    /// Create a regulator with zeroed state.
    pub fn new(gains: Gains, output_max: f32) -> Self {
        Self {
            gains,
            output_max,
            integral_limit: None,
            integral: 0.0,
            previous_error: 0.0,
        }
    }

    /// Clamp the integral accumulator to `[-limit, limit]` on every update.
    pub fn with_integral_limit(mut self, limit: f32) -> Self {
        self.integral_limit = Some(limit);
        self
    }

    /// One regulator step.
    ///
    /// `dt` is the time since the previous step in seconds and must be
    /// positive.
    ///
    /// # Examples
    ///
    /// ```
    /// use thermoloop::controller::{Gains, Regulator};
    ///
    /// let mut pid = Regulator::new(Gains::new(2.0, 0.5, 1.0), 255.0);
    /// // error 5: P = 10, I = 2.5, D = 5
    /// assert_eq!(pid.compute(25.0, 20.0, 1.0), 17.5);
    /// ```
    pub fn compute(&mut self, target: f32, measurement: f32, dt: f32) -> f32 {
        let error = target - measurement;

        let integral = self.integral + error * dt;
        self.integral = match self.integral_limit {
            Some(limit) => integral.clamp(-limit, limit),
            None => integral,
        };

        let derivative = (error - self.previous_error) / dt;
        self.previous_error = error;

        let raw = self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative;
        // `max` first: NaN from a degenerate input collapses to 0, not to output_max.
        raw.max(0.0).min(self.output_max)
    }

    /// Replace the gains. Accumulated state is kept.
    pub fn set_gains(&mut self, gains: Gains) {
        self.gains = gains;
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn previous_error(&self) -> f32 {
        self.previous_error
    }

    /// Zero the integral and previous error.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn reference_first_tick() {
        let mut pid = Regulator::new(Gains::new(2.0, 0.5, 1.0), 255.0);
        let out = pid.compute(25.0, 20.0, 1.0);
        assert!(close(out, 17.5));
        assert!(close(pid.integral(), 5.0));
        assert!(close(pid.previous_error(), 5.0));
    }

    #[test]
    fn second_tick_has_no_derivative_for_constant_error() {
        let mut pid = Regulator::new(Gains::new(2.0, 0.5, 1.0), 255.0);
        pid.compute(25.0, 20.0, 1.0);
        // P = 10, I = 0.5 * 10 = 5, D = 0
        assert!(close(pid.compute(25.0, 20.0, 1.0), 15.0));
    }

    #[test]
    fn output_clamped_to_max() {
        let mut pid = Regulator::new(Gains::new(100.0, 0.0, 0.0), 255.0);
        assert_eq!(pid.compute(100.0, 0.0, 0.1), 255.0);
    }

    #[test]
    fn output_never_negative() {
        let mut pid = Regulator::new(Gains::new(2.0, 0.5, 1.0), 255.0);
        assert_eq!(pid.compute(20.0, 80.0, 0.1), 0.0);
    }

    #[test]
    fn overheated_plant_trends_to_zero() {
        let mut pid = Regulator::new(Gains::new(2.0, 0.5, 1.0), 255.0);
        let mut last = f32::MAX;
        for _ in 0..50 {
            let out = pid.compute(25.0, 60.0, 0.5);
            assert!(out <= last);
            last = out;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn retune_keeps_state() {
        let mut pid = Regulator::new(Gains::new(1.0, 1.0, 0.0), 255.0);
        pid.compute(30.0, 20.0, 1.0);
        let integral = pid.integral();

        pid.set_gains(Gains::new(0.0, 2.0, 0.0));
        assert_eq!(pid.integral(), integral);
        // I-only: 2 * (10 + 10)
        assert!(close(pid.compute(30.0, 20.0, 1.0), 40.0));
        assert_eq!(pid.gains(), Gains::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn unclamped_integral_winds_up() {
        let mut pid = Regulator::new(Gains::new(1.0, 1.0, 0.0), 255.0);
        for _ in 0..100 {
            pid.compute(100.0, 0.0, 1.0);
        }
        assert!(close(pid.integral(), 10_000.0));
        // Error reversed, but the wound-up integral keeps the output pinned.
        assert_eq!(pid.compute(0.0, 50.0, 1.0), 255.0);
    }

    #[test]
    fn integral_limit_prevents_windup() {
        let mut pid = Regulator::new(Gains::new(1.0, 1.0, 0.0), 255.0).with_integral_limit(50.0);
        for _ in 0..100 {
            pid.compute(100.0, 0.0, 1.0);
        }
        assert_eq!(pid.integral(), 50.0);
        // -50 + (50 - 50) = -50 -> 0 immediately after reversal.
        assert_eq!(pid.compute(0.0, 50.0, 1.0), 0.0);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn reset_clears_history() {
        let mut pid = Regulator::new(Gains::new(2.0, 0.5, 1.0), 255.0);
        pid.compute(25.0, 20.0, 1.0);
        pid.reset();
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.previous_error(), 0.0);
        assert!(close(pid.compute(25.0, 20.0, 1.0), 17.5));
    }
}
