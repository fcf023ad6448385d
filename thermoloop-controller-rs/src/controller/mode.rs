use super::input::Step;

/// Operating mode of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// The regulator drives the heater towards the committed setpoint.
    #[default]
    Running,
    /// The operator is editing the proposed setpoint. Heater output is 0.
    Adjusting,
}

/// Closed range of selectable setpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetpointRange {
    pub min: f32,
    pub max: f32,
}

impl SetpointRange {
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Running / Adjusting state machine owning the committed and proposed
/// setpoints.
///
/// A press toggles the mode. Entering Adjusting copies the committed setpoint
/// into the proposal; leaving it commits the proposal. There is no timeout:
/// an unattended controller left in Adjusting keeps its heater off until the
/// button is pressed again.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeStateMachine {
    mode: Mode,
    setpoint: f32,
    proposed: f32,
    range: SetpointRange,
    step_size: f32,
}

impl ModeStateMachine {
    /// Start in [`Mode::Running`] with `setpoint` committed.
    ///
    /// `setpoint` is clamped into `range`.
    pub fn new(setpoint: f32, range: SetpointRange, step_size: f32) -> Self {
        let setpoint = range.clamp(setpoint);
        Self {
            mode: Mode::Running,
            setpoint,
            proposed: setpoint,
            range,
            step_size,
        }
    }

    /// Handle a debounced button press. Returns the new mode.
    ///
    /// # Examples
    ///
    /// ```
    /// use thermoloop::controller::{Mode, ModeStateMachine, SetpointRange, Step};
    ///
    /// let mut sm = ModeStateMachine::new(25.0, SetpointRange { min: 10.0, max: 100.0 }, 0.5);
    /// assert_eq!(sm.on_press(), Mode::Adjusting);
    /// sm.on_step(Step::Clockwise);
    /// sm.on_step(Step::Clockwise);
    /// assert_eq!(sm.setpoint(), 25.0); // not committed yet
    /// assert_eq!(sm.on_press(), Mode::Running);
    /// assert_eq!(sm.setpoint(), 26.0);
    /// ```
    pub fn on_press(&mut self) -> Mode {
        self.mode = match self.mode {
            Mode::Running => {
                self.proposed = self.setpoint;
                #[cfg(feature = "defmt")]
                defmt::info!("Adjusting: proposed setpoint {}", self.proposed);
                Mode::Adjusting
            }
            Mode::Adjusting => {
                self.setpoint = self.proposed;
                #[cfg(feature = "defmt")]
                defmt::info!("Running: setpoint committed at {}", self.setpoint);
                Mode::Running
            }
        };
        self.mode
    }

    /// Apply an encoder step. Ignored unless adjusting.
    pub fn on_step(&mut self, step: Step) {
        if self.mode != Mode::Adjusting {
            return;
        }
        let next = self.proposed + step.delta() as f32 * self.step_size;
        self.proposed = self.range.clamp(next);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The committed setpoint the regulator tracks.
    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    /// The draft setpoint. Equal to [`setpoint()`](Self::setpoint) outside
    /// Adjusting until the next edit session starts.
    pub fn proposed(&self) -> f32 {
        self.proposed
    }

    /// Proposed setpoint while adjusting, committed setpoint otherwise.
    pub fn displayed_setpoint(&self) -> f32 {
        match self.mode {
            Mode::Running => self.setpoint,
            Mode::Adjusting => self.proposed,
        }
    }

    pub fn range(&self) -> SetpointRange {
        self.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: SetpointRange = SetpointRange {
        min: 10.0,
        max: 100.0,
    };

    fn machine(setpoint: f32) -> ModeStateMachine {
        ModeStateMachine::new(setpoint, RANGE, 0.5)
    }

    #[test]
    fn starts_running_with_setpoint() {
        let sm = machine(25.0);
        assert_eq!(sm.mode(), Mode::Running);
        assert_eq!(sm.setpoint(), 25.0);
        assert_eq!(sm.displayed_setpoint(), 25.0);
    }

    #[test]
    fn initial_setpoint_is_clamped() {
        assert_eq!(machine(150.0).setpoint(), 100.0);
        assert_eq!(machine(-3.0).setpoint(), 10.0);
    }

    #[test]
    fn steps_ignored_while_running() {
        let mut sm = machine(25.0);
        sm.on_step(Step::Clockwise);
        sm.on_step(Step::Clockwise);
        assert_eq!(sm.setpoint(), 25.0);
        assert_eq!(sm.proposed(), 25.0);
    }

    #[test]
    fn entering_adjusting_copies_setpoint() {
        let mut sm = machine(42.5);
        sm.on_press();
        assert_eq!(sm.mode(), Mode::Adjusting);
        assert_eq!(sm.proposed(), 42.5);
    }

    #[test]
    fn steps_move_proposal_only() {
        let mut sm = machine(25.0);
        sm.on_press();
        sm.on_step(Step::CounterClockwise);
        sm.on_step(Step::CounterClockwise);
        sm.on_step(Step::CounterClockwise);
        assert_eq!(sm.proposed(), 23.5);
        assert_eq!(sm.setpoint(), 25.0);
        assert_eq!(sm.displayed_setpoint(), 23.5);
    }

    #[test]
    fn proposal_clamps_at_max() {
        let mut sm = machine(99.5);
        sm.on_press();
        for _ in 0..5 {
            sm.on_step(Step::Clockwise);
        }
        assert_eq!(sm.proposed(), 100.0);
        sm.on_step(Step::CounterClockwise);
        assert_eq!(sm.proposed(), 99.5);
    }

    #[test]
    fn proposal_clamps_at_min() {
        let mut sm = machine(10.0);
        sm.on_press();
        sm.on_step(Step::CounterClockwise);
        assert_eq!(sm.proposed(), 10.0);
    }

    #[test]
    fn enter_and_exit_without_steps_keeps_setpoint() {
        let mut sm = machine(37.0);
        sm.on_press();
        sm.on_press();
        assert_eq!(sm.mode(), Mode::Running);
        assert_eq!(sm.setpoint(), 37.0);
    }

    #[test]
    fn committing_twice_is_idempotent() {
        let mut sm = machine(25.0);
        sm.on_press();
        sm.on_step(Step::Clockwise);
        sm.on_press();
        assert_eq!(sm.setpoint(), 25.5);

        sm.on_press();
        sm.on_press();
        assert_eq!(sm.setpoint(), 25.5);
    }

    #[test]
    fn new_session_starts_from_committed_value() {
        let mut sm = machine(25.0);
        sm.on_press();
        sm.on_step(Step::Clockwise);
        sm.on_press(); // commit 25.5
        sm.on_press(); // new session
        assert_eq!(sm.proposed(), 25.5);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const RANGE: SetpointRange = SetpointRange {
        min: 10.0,
        max: 100.0,
    };

    fn any_step() -> impl Strategy<Value = Step> {
        prop_oneof![Just(Step::Clockwise), Just(Step::CounterClockwise)]
    }

    proptest! {
        #[test]
        fn proposal_stays_in_range(
            start in 10.0_f32..=100.0_f32,
            steps in prop::collection::vec(any_step(), 0..400),
        ) {
            let mut sm = ModeStateMachine::new(start, RANGE, 0.5);
            sm.on_press();
            for step in steps {
                sm.on_step(step);
                prop_assert!(RANGE.contains(sm.proposed()));
            }
        }

        #[test]
        fn order_does_not_matter_away_from_bounds(
            steps in prop::collection::vec(any_step(), 0..80),
        ) {
            // 80 steps of 0.5 from 55 cannot leave [15, 95].
            let net: i32 = steps.iter().map(|s| s.delta()).sum();
            let expected = 55.0 + 0.5 * net as f32;

            let mut forward = ModeStateMachine::new(55.0, RANGE, 0.5);
            forward.on_press();
            steps.iter().for_each(|&s| forward.on_step(s));

            let mut reversed = ModeStateMachine::new(55.0, RANGE, 0.5);
            reversed.on_press();
            steps.iter().rev().for_each(|&s| reversed.on_step(s));

            prop_assert_eq!(forward.proposed(), expected);
            prop_assert_eq!(reversed.proposed(), expected);
        }

        #[test]
        fn saturates_at_max(extra in 2_usize..200) {
            let mut sm = ModeStateMachine::new(99.0, RANGE, 0.5);
            sm.on_press();
            for _ in 0..extra {
                sm.on_step(Step::Clockwise);
            }
            prop_assert_eq!(sm.proposed(), 100.0);
            sm.on_press();
            prop_assert_eq!(sm.setpoint(), 100.0);
        }
    }
}
