use crossbeam_channel::{bounded, Receiver as CbReceiver, Sender as CbSender, TrySendError};
use std::{
    sync::mpsc::{channel, Receiver, SendError, Sender},
    thread,
};
use thread_priority::{set_current_thread_priority, ThreadPriority};

use super::{
    controller::LifecycleEvent, instruction::Instruction, spindle_feedback::SpindleFeedback,
    SpindleController,
};

/// Feedback messages kept until someone reads them, newer ones are dropped.
pub const FEEDBACK_CAPACITY: usize = 64;

/// Runs a [`SpindleController`] on its own thread.
///
/// Lines and lifecycle events are handled one after the other in the order
/// they were enqueued, so they never race on the output.
#[derive(Debug)]
pub struct SpindleControllerInterface {
    controller_thread: Option<thread::JoinHandle<()>>,
    instruction_sender: Sender<Instruction>,
    feedback_receiver: CbReceiver<SpindleFeedback>,
}

impl SpindleControllerInterface {
    pub fn new(controller: SpindleController) -> SpindleControllerInterface {
        let (instruction_sender, instruction_receiver) = channel();
        let (feedback_sender, feedback_receiver) = bounded(FEEDBACK_CAPACITY);

        let controller_thread = thread::Builder::new()
            .name(String::from("spindle"))
            .spawn(move || {
                if let Err(e) = set_current_thread_priority(ThreadPriority::Max) {
                    log::debug!("can not raise spindle thread priority {:?}", e);
                }
                run(controller, instruction_receiver, feedback_sender);
            });
        let controller_thread = match controller_thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("can not start spindle thread: {}", e);
                None
            }
        };

        Self {
            controller_thread,
            instruction_sender,
            feedback_receiver,
        }
    }

    pub fn enqueue_instruction(
        &self,
        instruction: Instruction,
    ) -> Result<(), SendError<Instruction>> {
        self.instruction_sender.send(instruction)
    }

    pub fn get_feedback_channel(&self) -> CbReceiver<SpindleFeedback> {
        self.feedback_receiver.clone()
    }

    /// Releases the output and waits for the controller thread to finish.
    pub fn shutdown(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        if let Some(handle) = self.controller_thread.take() {
            // the thread may already be gone, joining tells
            let _ = self.instruction_sender.send(Instruction::Shutdown);
            if handle.join().is_err() {
                log::error!("spindle thread panicked");
            }
        }
    }
}

impl Drop for SpindleControllerInterface {
    fn drop(&mut self) {
        self.stop_thread();
    }
}

fn run(
    mut controller: SpindleController,
    instruction_receiver: Receiver<Instruction>,
    feedback_sender: CbSender<SpindleFeedback>,
) {
    let mut last_status = None;
    for instruction in instruction_receiver.iter() {
        let shutdown = instruction == Instruction::Shutdown;
        let result = match instruction {
            Instruction::Line(line) => controller.process_line(&line),
            Instruction::Lifecycle(event) => controller.on_lifecycle(event),
            Instruction::Resync => controller.resync().map(|_| ()),
            Instruction::Shutdown => controller.on_lifecycle(LifecycleEvent::ShuttingDown),
        };
        if let Err(e) = result {
            publish(&feedback_sender, SpindleFeedback::Fault(e));
        }

        let status = controller.status();
        // an undelivered status is offered again after the next instruction
        if last_status != Some(status) && publish(&feedback_sender, SpindleFeedback::Status(status))
        {
            last_status = Some(status);
        }
        if shutdown {
            break;
        }
    }
    log::debug!("spindle thread done");
}

/// Never blocks the spindle thread on a slow or absent reader.
fn publish(feedback_sender: &CbSender<SpindleFeedback>, feedback: SpindleFeedback) -> bool {
    match feedback_sender.try_send(feedback) {
        Ok(()) => true,
        Err(TrySendError::Full(feedback)) => {
            log::trace!("feedback queue full, dropping {:?}", feedback);
            false
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}
