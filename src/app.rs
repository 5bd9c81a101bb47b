use std::{
    io::{self, BufRead, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use crate::host::{Configurable, LifecycleObserver, LineObserver, SpindlePlugin};
use crate::output::OutputFactory;
use crate::settings::Settings;
use crate::spindle::SpindleFeedback;

/// Pipes G-code from `input` to `out` unchanged while the spindle follows along.
pub struct App<F: OutputFactory + Clone + 'static> {
    plugin: SpindlePlugin<F>,
}

impl<F: OutputFactory + Clone + 'static> App<F> {
    pub fn new(factory: F) -> Self {
        App {
            plugin: SpindlePlugin::new(factory),
        }
    }

    /// A bad configuration only disables the spindle, lines are still passed through.
    pub fn configure(&mut self, settings: &Settings) -> bool {
        match self.plugin.configure(settings) {
            Ok(()) => true,
            Err(e) => {
                log::error!("spindle disabled: {}", e);
                false
            }
        }
    }

    /// After a spindle fault the next line is preceded by a resync of the output.
    pub fn run<R: BufRead, W: Write>(mut self, input: R, mut out: W) -> io::Result<()> {
        let faulted = Arc::new(AtomicBool::new(false));
        let reporter = self.plugin.feedback().map(|feedback| {
            let faulted = faulted.clone();
            thread::spawn(move || {
                for message in feedback.iter() {
                    match message {
                        SpindleFeedback::Status(status) => log::debug!("{:?}", status),
                        SpindleFeedback::Fault(e) => {
                            log::warn!("{}", e);
                            faulted.store(true, Ordering::Release);
                        }
                    }
                }
            })
        });

        self.plugin.on_event("Connecting");
        let mut result = Ok(());
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    result = Err(e);
                    break;
                }
            };
            if faulted.swap(false, Ordering::AcqRel) {
                self.plugin.resync();
            }
            if let Err(e) = writeln!(out, "{}", self.plugin.on_line_sending(&line)) {
                result = Err(e);
                break;
            }
        }
        out.flush()?;

        self.plugin.on_event("Disconnected");
        self.plugin.on_event("Shutdown");
        self.plugin.shutdown();
        if let Some(reporter) = reporter {
            if reporter.join().is_err() {
                log::error!("feedback reporter panicked");
            }
        }
        result
    }
}
