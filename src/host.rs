//! Seams towards the host: settings, command lines and lifecycle events.
use crossbeam_channel::Receiver as CbReceiver;

use crate::output::OutputFactory;
use crate::settings::Settings;
use crate::spindle::{
    Instruction, LifecycleEvent, SpindleController, SpindleControllerInterface, SpindleError,
    SpindleFeedback,
};

pub trait Configurable {
    fn configure(&mut self, settings: &Settings) -> Result<(), SpindleError>;
}

/// Observes the command stream without changing it.
pub trait LineObserver {
    fn on_line_sending<'a>(&self, line: &'a str) -> &'a str;
    fn on_line_received<'a>(&self, line: &'a str) -> &'a str;
}

pub trait LifecycleObserver {
    fn on_event(&self, name: &str);
}

/// Plugs a spindle controller into a host. Until it is configured every call is a no-op.
pub struct SpindlePlugin<F: OutputFactory + Clone + 'static> {
    factory: F,
    interface: Option<SpindleControllerInterface>,
}

impl<F: OutputFactory + Clone + 'static> SpindlePlugin<F> {
    pub fn new(factory: F) -> Self {
        SpindlePlugin {
            factory,
            interface: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.interface.is_some()
    }

    pub fn feedback(&self) -> Option<CbReceiver<SpindleFeedback>> {
        self.interface
            .as_ref()
            .map(|interface| interface.get_feedback_channel())
    }

    /// Asks the spindle to write its requested value again, e.g. after a fault.
    pub fn resync(&self) {
        self.enqueue(Instruction::Resync);
    }

    pub fn shutdown(&mut self) {
        if let Some(interface) = self.interface.take() {
            interface.shutdown();
        }
    }

    fn enqueue(&self, instruction: Instruction) {
        if let Some(interface) = self.interface.as_ref() {
            if let Err(e) = interface.enqueue_instruction(instruction) {
                log::warn!("spindle thread gone, dropping {:?}", e.0);
            }
        }
    }

    fn observe(&self, line: &str) {
        self.enqueue(Instruction::Line(line.to_owned()));
    }
}

impl<F: OutputFactory + Clone + 'static> Configurable for SpindlePlugin<F> {
    fn configure(&mut self, settings: &Settings) -> Result<(), SpindleError> {
        self.shutdown();
        let controller = SpindleController::new(settings, Box::new(self.factory.clone()))?;
        self.interface = Some(SpindleControllerInterface::new(controller));
        Ok(())
    }
}

impl<F: OutputFactory + Clone + 'static> LineObserver for SpindlePlugin<F> {
    fn on_line_sending<'a>(&self, line: &'a str) -> &'a str {
        self.observe(line);
        line
    }
    fn on_line_received<'a>(&self, line: &'a str) -> &'a str {
        self.observe(line);
        line
    }
}

impl<F: OutputFactory + Clone + 'static> LifecycleObserver for SpindlePlugin<F> {
    fn on_event(&self, name: &str) {
        match LifecycleEvent::from_name(name) {
            Some(event) => self.enqueue(Instruction::Lifecycle(event)),
            None => log::trace!("ignoring host event {}", name),
        }
    }
}
