use super::controller::LifecycleEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // one line of command text, sent or received
    Line(String),
    Lifecycle(LifecycleEvent),
    // write the requested value again if the output lost it
    Resync,
    // release the output and end the controller thread
    Shutdown,
}
