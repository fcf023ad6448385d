//! Rotary encoder and push-button decoding.
//!
//! Both decoders are sampled once per control-loop tick with raw pin levels
//! and a monotonic timestamp; neither sleeps.

use embassy_time::{Duration, Instant};

/// A single direction-classified encoder step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Channel B disagreed with channel A's new level.
    Clockwise,
    /// Channel B agreed with channel A's new level.
    CounterClockwise,
}

impl Step {
    /// Signed unit delta: `+1` clockwise, `-1` counter-clockwise.
    pub fn delta(self) -> i32 {
        match self {
            Step::Clockwise => 1,
            Step::CounterClockwise => -1,
        }
    }
}

/// Single-edge quadrature decoder.
///
/// A step is emitted on every transition of the primary channel (A), with
/// the direction taken from the secondary channel (B) at the same sample.
/// Bounce can occasionally produce a missed or doubled step; consumers treat
/// each step as a discrete nudge, never as an absolute position.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QuadratureDecoder {
    last_a: bool,
    position: i32,
}

impl QuadratureDecoder {
    /// Create a decoder whose baseline is the current level of channel A.
    pub fn new(initial_a: bool) -> Self {
        Self {
            last_a: initial_a,
            position: 0,
        }
    }

    /// Feed one sample of both channels.
    ///
    /// # Examples
    ///
    /// ```
    /// use thermoloop::controller::{QuadratureDecoder, Step};
    ///
    /// let mut dec = QuadratureDecoder::new(true);
    /// assert_eq!(dec.update(true, false), None);                 // no edge on A
    /// assert_eq!(dec.update(false, true), Some(Step::Clockwise)); // A fell, B disagrees
    /// assert_eq!(dec.position(), 1);
    /// ```
    pub fn update(&mut self, a: bool, b: bool) -> Option<Step> {
        if a == self.last_a {
            return None;
        }
        self.last_a = a;

        let step = if b != a {
            Step::Clockwise
        } else {
            Step::CounterClockwise
        };
        self.position = self.position.wrapping_add(step.delta());
        Some(step)
    }

    /// Net steps seen since construction. Diagnostic only.
    pub fn position(&self) -> i32 {
        self.position
    }
}

/// Emitted once per accepted press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Press;

/// Time-based debouncer for an active-low push-button.
///
/// After a level change is accepted, further changes are ignored until the
/// quiet window has elapsed. A single differing sample after the window is
/// enough to accept the new level; a press event is produced only when the
/// accepted level is the pressed (low) level.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonDebouncer {
    window: Duration,
    /// Last accepted raw level. `true` = high = released.
    stable_high: bool,
    last_change: Option<Instant>,
}

impl ButtonDebouncer {
    /// Create a debouncer with the button initially released.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            stable_high: true,
            last_change: None,
        }
    }

    /// Feed one raw sample taken at `now`.
    ///
    /// `level_high` is the raw pin level; with the active-low wiring a low
    /// level means the button is held.
    pub fn update(&mut self, level_high: bool, now: Instant) -> Option<Press> {
        if level_high == self.stable_high {
            return None;
        }
        if let Some(last) = self.last_change {
            // Instants are monotonic; a sample stamped earlier than the last
            // accepted change is treated as still inside the window.
            match now.checked_duration_since(last) {
                Some(elapsed) if elapsed >= self.window => {}
                _ => return None,
            }
        }

        self.stable_high = level_high;
        self.last_change = Some(now);

        if level_high {
            None
        } else {
            Some(Press)
        }
    }

    /// `true` while the last accepted level is the pressed level.
    pub fn is_pressed(&self) -> bool {
        !self.stable_high
    }
}
