//! Run controller: at most one organization run at a time.
//!
//! The engine runs on a background thread and reports into a
//! [`ChannelObserver`]. The thread that owns the controller (and the real
//! observer) drains those events with [`RunController::dispatch_pending`]
//! from its event loop, or blocks on [`RunController::wait`]. Either way,
//! every observer callback happens on the owner's thread.
//!
//! The controller counts as busy from [`RunController::start`] until the
//! run's final event has been dispatched, and only then fires
//! [`Observer::on_run_complete`].

use crate::file_category::CategoryTable;
use crate::file_organizer::{OrganizeOptions, OrganizerEngine, RunResult, RunState};
use crate::observer::{ChannelObserver, Observer, RunEvent};
use crossbeam_channel::{Receiver, TryRecvError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use thiserror::Error;
use tracing::{info, warn};

/// Maximum number of events that may queue up before the worker blocks.
///
/// A run emits three or four events per file. If the observer stops
/// draining, the worker waits instead of buffering without bound.
pub const EVENT_CHANNEL_CAPACITY: usize = 4_096;

/// Errors from starting a run.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("An organization run is already in progress.")]
    AlreadyRunning,
    #[error("Could not start worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

struct ActiveRun {
    events: Receiver<RunEvent>,
    cancel_flag: Arc<AtomicBool>,
    options: OrganizeOptions,
    thread: Option<thread::JoinHandle<()>>,
}

/// Starts runs on a background thread and hands their events to an observer.
#[derive(Default)]
pub struct RunController {
    active: Option<ActiveRun>,
}

impl RunController {
    pub fn new() -> Self {
        Self::default()
    }

    /// True from `start` until the completion callback has fired.
    ///
    /// Presentation layers disable their "organize" control while this is set.
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Starts a run on a snapshot of `table`.
    ///
    /// Resets the observer's progress and sets its status before the worker
    /// starts.
    ///
    /// # Errors
    ///
    /// [`ControllerError::AlreadyRunning`] if a run is still active,
    /// [`ControllerError::Spawn`] if the worker thread cannot be created.
    pub fn start(
        &mut self,
        options: OrganizeOptions,
        table: &CategoryTable,
        observer: &mut dyn Observer,
    ) -> Result<(), ControllerError> {
        if self.is_running() {
            warn!("Refusing to start a second run");
            return Err(ControllerError::AlreadyRunning);
        }

        let (tx, rx) = crossbeam_channel::bounded::<RunEvent>(EVENT_CHANNEL_CAPACITY);
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let engine = OrganizerEngine::new(options.clone(), table.clone())
            .with_cancel_flag(cancel_flag.clone());

        let thread = thread::Builder::new()
            .name("dirsort-organizer".into())
            .spawn(move || {
                let mut channel = ChannelObserver::new(tx);
                let result = engine.run(&mut channel);
                channel.finish(result);
            })?;

        info!(base = %options.base_directory.display(), "Run started");
        observer.on_progress(0, 0);
        observer.on_status("Processing...");

        self.active = Some(ActiveRun {
            events: rx,
            cancel_flag,
            options,
            thread: Some(thread),
        });
        Ok(())
    }

    /// Asks the active run to stop before its next file.
    pub fn cancel(&self) {
        if let Some(active) = &self.active {
            active.cancel_flag.store(true, Ordering::Relaxed);
        }
    }

    /// Delivers every event that is already queued, without blocking.
    ///
    /// Returns the result once the run is over; the controller is idle again
    /// at that point.
    pub fn dispatch_pending(&mut self, observer: &mut dyn Observer) -> Option<RunResult> {
        loop {
            let received = match &self.active {
                Some(active) => active.events.try_recv(),
                None => return None,
            };
            match received {
                Ok(event) => {
                    if let Some(result) = self.deliver(event, observer) {
                        return Some(result);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(self.worker_lost(observer)),
            }
        }
    }

    /// Blocks, delivering events as they arrive, until the run is over.
    ///
    /// Returns `None` if no run is active.
    pub fn wait(&mut self, observer: &mut dyn Observer) -> Option<RunResult> {
        loop {
            let received = match &self.active {
                Some(active) => active.events.recv(),
                None => return None,
            };
            match received {
                Ok(event) => {
                    if let Some(result) = self.deliver(event, observer) {
                        return Some(result);
                    }
                }
                Err(_) => return Some(self.worker_lost(observer)),
            }
        }
    }

    fn deliver(&mut self, event: RunEvent, observer: &mut dyn Observer) -> Option<RunResult> {
        match event {
            RunEvent::Log(message) => observer.on_log(&message),
            RunEvent::Progress { processed, total } => observer.on_progress(processed, total),
            RunEvent::Status(text) => observer.on_status(&text),
            RunEvent::Finished(result) => {
                self.complete(observer);
                return Some(*result);
            }
        }
        None
    }

    /// The worker went away without sending a result (it panicked).
    fn worker_lost(&mut self, observer: &mut dyn Observer) -> RunResult {
        warn!("Organizer thread ended without a result");
        let options = self
            .active
            .as_ref()
            .map(|active| active.options.clone())
            .unwrap_or_else(|| OrganizeOptions::new(""));
        observer.on_log("Error: the organizer stopped unexpectedly.");
        observer.on_status("Error occurred");
        self.complete(observer);
        RunResult::interrupted(&options, RunState::Aborted)
    }

    fn complete(&mut self, observer: &mut dyn Observer) {
        if let Some(mut active) = self.active.take()
            && let Some(handle) = active.thread.take()
        {
            let _ = handle.join();
        }
        observer.on_run_complete();
    }
}

impl Drop for RunController {
    fn drop(&mut self) {
        // Let an abandoned run finish its current file and stop.
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        logs: Vec<String>,
        statuses: Vec<String>,
        completions: usize,
    }

    impl Observer for Recorder {
        fn on_log(&mut self, message: &str) {
            self.logs.push(message.to_string());
        }
        fn on_progress(&mut self, _processed: usize, _total: usize) {}
        fn on_status(&mut self, text: &str) {
            self.statuses.push(text.to_string());
        }
        fn on_run_complete(&mut self) {
            self.completions += 1;
        }
    }

    #[test]
    fn test_wait_delivers_everything_then_completes_once() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();

        let mut controller = RunController::new();
        let mut recorder = Recorder::default();
        controller
            .start(
                OrganizeOptions::new(temp_dir.path()),
                &CategoryTable::default(),
                &mut recorder,
            )
            .unwrap();
        assert!(controller.is_running());

        let result = controller.wait(&mut recorder).expect("run result");

        assert!(!controller.is_running());
        assert_eq!(recorder.completions, 1);
        assert_eq!(result.processed, 1);
        assert_eq!(
            recorder.logs.last().unwrap(),
            "Organization complete! Processed 1 files."
        );
        assert!(controller.wait(&mut recorder).is_none());
        assert_eq!(recorder.completions, 1);
    }

    #[test]
    fn test_second_start_is_refused_until_completion() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut controller = RunController::new();
        let mut recorder = Recorder::default();
        let options = OrganizeOptions::new(temp_dir.path()).preview(true);
        let table = CategoryTable::default();

        controller
            .start(options.clone(), &table, &mut recorder)
            .unwrap();
        assert!(matches!(
            controller.start(options.clone(), &table, &mut recorder),
            Err(ControllerError::AlreadyRunning)
        ));

        // Still busy even after the worker is done, until events are dispatched.
        thread::sleep(Duration::from_millis(50));
        assert!(controller.is_running());

        let deadline = Instant::now() + Duration::from_secs(10);
        let result = loop {
            if let Some(result) = controller.dispatch_pending(&mut recorder) {
                break result;
            }
            assert!(Instant::now() < deadline, "run did not finish");
            thread::sleep(Duration::from_millis(5));
        };

        assert_eq!(result.total, 0);
        assert!(!controller.is_running());
        assert_eq!(recorder.completions, 1);
        controller.start(options, &table, &mut recorder).unwrap();
        controller.wait(&mut recorder).unwrap();
        assert_eq!(recorder.completions, 2);
    }

    #[test]
    fn test_aborted_run_still_completes() {
        let mut controller = RunController::new();
        let mut recorder = Recorder::default();
        controller
            .start(
                OrganizeOptions::new("/non/existent/path"),
                &CategoryTable::default(),
                &mut recorder,
            )
            .unwrap();

        let result = controller.wait(&mut recorder).unwrap();
        assert!(result.is_aborted());
        assert_eq!(recorder.completions, 1);
        assert_eq!(recorder.logs.len(), 1);
    }

    #[test]
    fn test_lost_worker_still_completes_once() {
        let (tx, rx) = crossbeam_channel::bounded::<RunEvent>(EVENT_CHANNEL_CAPACITY);
        let worker = thread::spawn(move || {
            let _ = tx.send(RunEvent::Log("Starting organization of: /data".into()));
            panic!("worker died before finishing");
        });
        let mut controller = RunController {
            active: Some(ActiveRun {
                events: rx,
                cancel_flag: Arc::new(AtomicBool::new(false)),
                options: OrganizeOptions::new("/data").preview(true),
                thread: Some(worker),
            }),
        };
        let mut recorder = Recorder::default();

        let result = controller.wait(&mut recorder).expect("synthesized result");

        assert_eq!(result.state, RunState::Aborted);
        assert!(result.preview);
        assert_eq!(result.total, 0);
        assert_eq!(
            recorder.logs,
            vec![
                "Starting organization of: /data".to_string(),
                "Error: the organizer stopped unexpectedly.".to_string(),
            ]
        );
        assert_eq!(recorder.statuses.last().unwrap(), "Error occurred");
        assert_eq!(recorder.completions, 1);
        assert!(!controller.is_running());
        assert!(controller.wait(&mut recorder).is_none());
        assert_eq!(recorder.completions, 1);
    }

    #[test]
    fn test_dispatch_pending_when_idle() {
        let mut controller = RunController::new();
        assert!(controller.dispatch_pending(&mut Recorder::default()).is_none());
        controller.cancel();
    }
}
