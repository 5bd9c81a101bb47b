use crate::command::SpindleEvent;
use crate::output::{Output, Result};
use crate::range_mapper::{self, SpeedWindow};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpindleState {
    /// stop latch, set by M5 and cleared by M3
    pub stopped: bool,
    /// last value computed from a speed command, written or not
    pub target_value: f64,
    /// last value the output confirmed, `None` until known
    pub applied_value: Option<f64>,
}

impl SpindleState {
    pub fn initial(initial_value: f64) -> Self {
        SpindleState {
            stopped: false,
            target_value: initial_value,
            applied_value: None,
        }
    }
}

/// Decides what the output has to drive for each spindle event.
///
/// `stopped` and `target_value` always hold the requested state, `applied_value`
/// only changes after a successful write. A failed write therefore leaves the
/// two apart until [`SpindleStateMachine::resync`] succeeds.
#[derive(Debug)]
pub struct SpindleStateMachine {
    state: SpindleState,
    window: SpeedWindow,
    initial_value: f64,
}

impl SpindleStateMachine {
    pub fn new(window: SpeedWindow, initial_value: f64) -> Self {
        SpindleStateMachine {
            state: SpindleState::initial(initial_value),
            window,
            initial_value,
        }
    }

    pub fn state(&self) -> SpindleState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = SpindleState::initial(self.initial_value);
    }

    pub fn record_applied(&mut self, value: Option<f64>) {
        self.state.applied_value = value;
    }

    pub fn apply(&mut self, event: SpindleEvent, output: &mut dyn Output) -> Result<()> {
        match event {
            SpindleEvent::Stop => {
                if self.state.stopped {
                    return Ok(());
                }
                self.state.stopped = true;
                log::debug!("stop spindle (M5)");
                // always written, even if the output should already be there
                let value = output.disable_value();
                self.write(output, value)
            }
            SpindleEvent::Start => {
                if !self.state.stopped {
                    return Ok(());
                }
                self.state.stopped = false;
                log::debug!("resume spindle (M3) at {}", self.state.target_value);
                if self.state.applied_value == Some(self.state.target_value) {
                    return Ok(());
                }
                self.write(output, self.state.target_value)
            }
            SpindleEvent::Speed(speed) => {
                let value = range_mapper::map(speed, self.window, output.range());
                if value == self.state.target_value {
                    return Ok(());
                }
                self.state.target_value = value;
                if self.state.stopped {
                    log::debug!("spindle stopped, keep {} for next start", value);
                    return Ok(());
                }
                self.write(output, value)
            }
        }
    }

    /// Writes the requested value if the output is known to differ. Returns whether it wrote.
    pub fn resync(&mut self, output: &mut dyn Output) -> Result<bool> {
        let wanted = if self.state.stopped {
            output.disable_value()
        } else {
            self.state.target_value
        };
        if self.state.applied_value == Some(wanted) {
            return Ok(false);
        }
        self.write(output, wanted).map(|_| true)
    }

    fn write(&mut self, output: &mut dyn Output, value: f64) -> Result<()> {
        log::debug!("spindle output -> {}", value);
        output.set(value)?;
        self.state.applied_value = Some(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{MockOutput, OutputJournal, OutputRange};

    fn setup() -> (SpindleStateMachine, MockOutput, OutputJournal) {
        let journal = OutputJournal::default();
        let output = MockOutput::new(OutputRange::new(-1.0, 1.0), -1.0, journal.clone());
        let mut machine = SpindleStateMachine::new(SpeedWindow::new(0.0, 10000.0).unwrap(), -1.0);
        machine.record_applied(Some(-1.0));
        (machine, output, journal)
    }

    #[test]
    fn speed_writes_mapped_value() {
        let (mut machine, mut output, journal) = setup();
        machine.apply(SpindleEvent::Speed(5000.0), &mut output).unwrap();
        assert_eq!(journal.writes(), vec![0.0]);
        assert_eq!(machine.state().target_value, 0.0);
        assert_eq!(machine.state().applied_value, Some(0.0));
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut machine, mut output, journal) = setup();
        machine.apply(SpindleEvent::Stop, &mut output).unwrap();
        machine.apply(SpindleEvent::Stop, &mut output).unwrap();
        assert_eq!(journal.writes(), vec![-1.0]);
        assert!(machine.state().stopped);
    }

    #[test]
    fn stop_writes_even_when_output_is_at_minimum() {
        let (mut machine, mut output, journal) = setup();
        assert_eq!(machine.state().applied_value, Some(-1.0));
        machine.apply(SpindleEvent::Stop, &mut output).unwrap();
        assert_eq!(journal.writes(), vec![-1.0]);
    }

    #[test]
    fn speed_while_stopped_waits_for_start() {
        let (mut machine, mut output, journal) = setup();
        machine.apply(SpindleEvent::Stop, &mut output).unwrap();
        journal.clear();

        machine.apply(SpindleEvent::Speed(7500.0), &mut output).unwrap();
        assert!(journal.writes().is_empty());
        assert_eq!(machine.state().target_value, 0.5);

        machine.apply(SpindleEvent::Start, &mut output).unwrap();
        assert_eq!(journal.writes(), vec![0.5]);
        assert!(!machine.state().stopped);
    }

    #[test]
    fn start_without_stop_does_nothing() {
        let (mut machine, mut output, journal) = setup();
        machine.apply(SpindleEvent::Speed(10000.0), &mut output).unwrap();
        machine.apply(SpindleEvent::Start, &mut output).unwrap();
        assert_eq!(journal.writes(), vec![1.0]);
    }

    #[test]
    fn start_skips_write_when_output_already_at_target() {
        let (mut machine, mut output, journal) = setup();
        machine.apply(SpindleEvent::Stop, &mut output).unwrap();
        // target is still the initial -1, which the stop just wrote
        machine.apply(SpindleEvent::Start, &mut output).unwrap();
        assert_eq!(journal.writes(), vec![-1.0]);
    }

    #[test]
    fn equal_speeds_write_once() {
        let (mut machine, mut output, journal) = setup();
        machine.apply(SpindleEvent::Speed(2500.0), &mut output).unwrap();
        machine.apply(SpindleEvent::Speed(2500.0), &mut output).unwrap();
        // both clamp to the maximum
        machine.apply(SpindleEvent::Speed(20000.0), &mut output).unwrap();
        machine.apply(SpindleEvent::Speed(30000.0), &mut output).unwrap();
        assert_eq!(journal.writes(), vec![-0.5, 1.0]);
    }

    #[test]
    fn failed_write_keeps_target_and_resyncs() {
        let (mut machine, mut output, journal) = setup();
        journal.set_failing(true);
        assert!(machine.apply(SpindleEvent::Speed(5000.0), &mut output).is_err());
        assert_eq!(machine.state().target_value, 0.0);
        assert_eq!(machine.state().applied_value, Some(-1.0));

        journal.set_failing(false);
        assert!(machine.resync(&mut output).unwrap());
        assert!(!machine.resync(&mut output).unwrap());
        assert_eq!(journal.writes(), vec![0.0]);
        assert_eq!(machine.state().applied_value, Some(0.0));
    }

    #[test]
    fn failed_stop_keeps_latch_and_resyncs_to_disable() {
        let (mut machine, mut output, journal) = setup();
        machine.apply(SpindleEvent::Speed(10000.0), &mut output).unwrap();
        journal.set_failing(true);
        assert!(machine.apply(SpindleEvent::Stop, &mut output).is_err());
        assert!(machine.state().stopped);

        journal.set_failing(false);
        assert!(machine.resync(&mut output).unwrap());
        assert_eq!(journal.writes(), vec![1.0, -1.0]);
    }

    #[test]
    fn reset_restores_initial_state() {
        let (mut machine, mut output, _journal) = setup();
        machine.apply(SpindleEvent::Speed(5000.0), &mut output).unwrap();
        machine.apply(SpindleEvent::Stop, &mut output).unwrap();
        machine.reset();
        assert_eq!(machine.state(), SpindleState::initial(-1.0));
    }
}
