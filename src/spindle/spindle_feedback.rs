use super::{SpindleError, SpindleStatus};

#[derive(Debug)]
pub enum SpindleFeedback {
    Status(SpindleStatus),
    Fault(SpindleError),
}
