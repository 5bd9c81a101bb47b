use super::state_machine::SpindleStateMachine;
use super::{SpindleError, SpindleStatus};
use crate::command::CommandInterpreter;
use crate::output::{Output, OutputFactory};
use crate::settings::{OutputSettings, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connecting,
    Disconnected,
    ShuttingDown,
}

impl LifecycleEvent {
    /// Host event names, everything else is not a lifecycle event for the spindle.
    pub fn from_name(name: &str) -> Option<LifecycleEvent> {
        match name {
            "Connecting" => Some(LifecycleEvent::Connecting),
            "Disconnected" => Some(LifecycleEvent::Disconnected),
            "Shutdown" | "ShuttingDown" => Some(LifecycleEvent::ShuttingDown),
            _ => None,
        }
    }
}

/// Owns the output of a session and feeds command lines into the state machine.
pub struct SpindleController {
    settings: OutputSettings,
    factory: Box<dyn OutputFactory>,
    interpreter: CommandInterpreter,
    machine: SpindleStateMachine,
    output: Option<Box<dyn Output>>,
}

impl SpindleController {
    pub fn new(
        settings: &Settings,
        factory: Box<dyn OutputFactory>,
    ) -> Result<SpindleController, SpindleError> {
        settings.validate()?;
        let window = settings.speed_window()?;
        Ok(SpindleController {
            settings: settings.output_settings(),
            factory,
            interpreter: CommandInterpreter::new(settings.command_tokens())?,
            machine: SpindleStateMachine::new(window, settings.servo_initial_value),
            output: None,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.output.is_some()
    }

    pub fn status(&self) -> SpindleStatus {
        let state = self.machine.state();
        SpindleStatus {
            connected: self.is_connected(),
            stopped: state.stopped,
            target_value: state.target_value,
            applied_value: state.applied_value,
        }
    }

    pub fn on_lifecycle(&mut self, event: LifecycleEvent) -> Result<(), SpindleError> {
        match event {
            LifecycleEvent::Connecting => self.connect(),
            LifecycleEvent::Disconnected | LifecycleEvent::ShuttingDown => self.release(),
        }
    }

    /// Applies every spindle event found in `line`. All events are applied even if
    /// one write fails, the first failure is returned.
    pub fn process_line(&mut self, line: &str) -> Result<(), SpindleError> {
        let events = self.interpreter.interpret(line);
        if events.is_empty() {
            return Ok(());
        }
        let output = match self.output.as_deref_mut() {
            Some(output) => output,
            None => {
                log::warn!("spindle output not connected, dropping {:?}", line.trim());
                return Ok(());
            }
        };

        let mut result = Ok(());
        for event in events {
            if let Err(e) = self.machine.apply(event, output) {
                log::error!("{:?} from {:?} failed: {}", event, line.trim(), e);
                if result.is_ok() {
                    result = Err(SpindleError::Output(e));
                }
            }
        }
        result
    }

    /// Retries the last requested value, see [`SpindleStateMachine::resync`].
    pub fn resync(&mut self) -> Result<bool, SpindleError> {
        match self.output.as_deref_mut() {
            Some(output) => Ok(self.machine.resync(output)?),
            None => Ok(false),
        }
    }

    fn connect(&mut self) -> Result<(), SpindleError> {
        if self.output.is_some() {
            log::warn!("spindle output still active on connect, releasing it first");
            if let Err(e) = self.release() {
                log::warn!("releasing stale spindle output: {}", e);
            }
        }
        self.machine.reset();
        let mut output = self.factory.create(&self.settings)?;
        let applied = output.applied().ok();
        self.machine.record_applied(applied);
        self.output = Some(output);
        log::info!("spindle output ready, initial value {:?}", applied);
        Ok(())
    }

    fn release(&mut self) -> Result<(), SpindleError> {
        let mut output = match self.output.take() {
            Some(output) => output,
            None => return Ok(()),
        };
        let written = output.set(self.settings.initial_value);
        if let Err(e) = &written {
            log::warn!("can not park spindle at {}: {}", self.settings.initial_value, e);
        }
        let stopped = output.stop();
        self.machine.reset();
        log::info!("spindle output released");
        written.and(stopped).map_err(SpindleError::from)
    }
}

impl Drop for SpindleController {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::error!("spindle output release on drop failed: {}", e);
        }
    }
}
