//! Pico 2 implementations of the controller's heater and input traits.

use defmt::*;
use embassy_rp::gpio::Input;
use embedded_hal::pwm::SetDutyCycle;
use thermoloop::controller::{ControlInputs, PowerOutput, RawInputs};

/// Heater switched by a PWM channel; `output_max` maps to 100 % duty.
pub struct PwmHeater<P> {
    pwm: P,
    output_max: u16,
}

impl<P: SetDutyCycle> PwmHeater<P> {
    /// `output_max` must be non-zero.
    pub fn new(pwm: P, output_max: u16) -> Self {
        Self { pwm, output_max }
    }
}

impl<P: SetDutyCycle> PowerOutput for PwmHeater<P> {
    fn set_output(&mut self, level: u16) {
        let level = level.min(self.output_max);
        if self.pwm.set_duty_cycle_fraction(level, self.output_max).is_err() {
            error!("Heater PWM update failed (level {})", level);
        }
    }
}

/// Rotary encoder channels and push button, all active-low with pull-ups.
pub struct PanelInputs<'d> {
    encoder_a: Input<'d>,
    encoder_b: Input<'d>,
    button: Input<'d>,
}

impl<'d> PanelInputs<'d> {
    pub fn new(encoder_a: Input<'d>, encoder_b: Input<'d>, button: Input<'d>) -> Self {
        Self {
            encoder_a,
            encoder_b,
            button,
        }
    }
}

impl ControlInputs for PanelInputs<'_> {
    fn sample(&mut self) -> RawInputs {
        RawInputs {
            encoder_a: self.encoder_a.is_high(),
            encoder_b: self.encoder_b.is_high(),
            button_high: self.button.is_high(),
        }
    }
}
