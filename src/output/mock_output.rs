use super::{Output, OutputError, OutputFactory, OutputRange, Result};
use crate::settings::OutputSettings;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputCall {
    Init(f64),
    Set(f64),
    Stop,
}

#[derive(Debug, Default)]
struct JournalState {
    calls: Vec<OutputCall>,
    failing: bool,
}

/// Shared record of every call made on mock outputs.
#[derive(Debug, Clone, Default)]
pub struct OutputJournal {
    state: Arc<Mutex<JournalState>>,
}

impl OutputJournal {
    fn lock(&self) -> MutexGuard<'_, JournalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn calls(&self) -> Vec<OutputCall> {
        self.lock().calls.clone()
    }
    /// Values passed to `set`, in order.
    pub fn writes(&self) -> Vec<f64> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                OutputCall::Set(value) => Some(*value),
                _ => None,
            })
            .collect()
    }
    pub fn clear(&self) {
        self.lock().calls.clear();
    }
    /// Makes every following `set` fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }
    fn record(&self, call: OutputCall) {
        self.lock().calls.push(call);
    }
    fn failing(&self) -> bool {
        self.lock().failing
    }
}

#[derive(Debug)]
pub struct MockOutput {
    range: OutputRange,
    value: Option<f64>,
    journal: OutputJournal,
}

impl MockOutput {
    pub fn new(range: OutputRange, initial_value: f64, journal: OutputJournal) -> Self {
        let value = range.clamp(initial_value);
        journal.record(OutputCall::Init(value));
        MockOutput {
            range,
            value: Some(value),
            journal,
        }
    }
}

impl Output for MockOutput {
    fn range(&self) -> OutputRange {
        self.range
    }
    fn set(&mut self, value: f64) -> Result<()> {
        if self.journal.failing() {
            return Err(OutputError::Rejected {
                value,
                reason: String::from("mock output is failing"),
            });
        }
        let value = self.range.clamp(value);
        log::debug!("mock output -> {}", value);
        self.journal.record(OutputCall::Set(value));
        self.value = Some(value);
        Ok(())
    }
    fn applied(&mut self) -> Result<f64> {
        self.value.ok_or(OutputError::Stopped)
    }
    fn stop(&mut self) -> Result<()> {
        self.journal.record(OutputCall::Stop);
        self.value = None;
        Ok(())
    }
}

/// Builds mock outputs that all report into one journal.
#[derive(Debug, Clone, Default)]
pub struct MockOutputFactory {
    pub journal: OutputJournal,
}

impl MockOutputFactory {
    pub fn new(journal: OutputJournal) -> Self {
        Self { journal }
    }
}

impl OutputFactory for MockOutputFactory {
    fn create(&self, settings: &OutputSettings) -> Result<Box<dyn Output>> {
        Ok(Box::new(MockOutput::new(
            settings.range(),
            settings.initial_value,
            self.journal.clone(),
        )))
    }
}
