//! Observer contract between the core and whatever presents it.
//!
//! The engine and the category manager only ever talk to a `dyn Observer`.
//! [`ChannelObserver`] forwards those calls as [`RunEvent`]s so a background
//! run can report to an observer that lives on another thread.

use crate::file_organizer::RunResult;
use crossbeam_channel::Sender;

/// Receives log lines, progress and status updates.
///
/// Implementations are assumed to be tied to one thread; the
/// [`RunController`](crate::controller::RunController) makes sure every call
/// for a background run happens on the thread that drains its events.
pub trait Observer {
    /// Appends a line to the log. Called at least once per processed file.
    fn on_log(&mut self, message: &str);

    /// `processed` never decreases within a run; `total == 0` means reset.
    fn on_progress(&mut self, processed: usize, total: usize);

    /// Free-form state text ("Processing... 3/10 files").
    fn on_status(&mut self, text: &str);

    /// Fired exactly once per run by the controller, after the summary log.
    fn on_run_complete(&mut self) {}
}

/// An observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_log(&mut self, _message: &str) {}
    fn on_progress(&mut self, _processed: usize, _total: usize) {}
    fn on_status(&mut self, _text: &str) {}
}

/// Messages sent from a run's worker thread to the observer's thread.
#[derive(Debug)]
pub enum RunEvent {
    Log(String),
    Progress { processed: usize, total: usize },
    Status(String),
    /// The run is over. Always the last event of a run.
    Finished(Box<RunResult>),
}

/// Forwards observer calls over a channel instead of invoking them directly.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: Sender<RunEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<RunEvent>) -> Self {
        Self { tx }
    }

    /// Sends the final result. Consumes the observer so nothing follows it.
    pub fn finish(self, result: RunResult) {
        let _ = self.tx.send(RunEvent::Finished(Box::new(result)));
    }
}

// A closed receiver means the observer side went away; the run still finishes.
impl Observer for ChannelObserver {
    fn on_log(&mut self, message: &str) {
        let _ = self.tx.send(RunEvent::Log(message.to_string()));
    }

    fn on_progress(&mut self, processed: usize, total: usize) {
        let _ = self.tx.send(RunEvent::Progress { processed, total });
    }

    fn on_status(&mut self, text: &str) {
        let _ = self.tx.send(RunEvent::Status(text.to_string()));
    }
}
