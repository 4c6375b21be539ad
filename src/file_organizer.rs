/// The organization engine.
///
/// One call to [`OrganizerEngine::run`] is one run: it lists the regular
/// files directly inside the base directory, classifies each by extension,
/// and moves it (or, in preview mode, only reports where it would go) into
/// `base/<category>/`. Progress and log lines go to an [`Observer`].
///
/// Only a missing or unreadable base directory aborts a run. Everything else
/// is caught per file and recorded as that file's outcome.
use crate::destination;
use crate::extensions;
use crate::file_category::CategoryTable;
use crate::observer::Observer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while organizing.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The base directory does not exist or is not a directory. Fatal.
    #[error("Selected folder does not exist: {}", .0.display())]
    BaseDirectoryNotFound(PathBuf),
    /// The base directory exists but cannot be listed. Fatal.
    #[error("Cannot read folder {}: {source}", .path.display())]
    BaseDirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Creating a category directory failed. The file is skipped.
    #[error("Could not create folder {}: {source}", .path.display())]
    DestinationCreateFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The category directory is missing and was not created. The file is skipped.
    #[error("Destination folder doesn't exist: {}", .0.display())]
    DestinationMissing(PathBuf),
    /// The rename failed. The file stays where it was.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    MoveFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Settings for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizeOptions {
    /// The directory whose files are sorted.
    pub base_directory: PathBuf,
    /// Create missing category folders.
    pub create_folders: bool,
    /// Treat dot-prefixed files as candidates.
    pub include_hidden: bool,
    /// Compute and report moves without touching the filesystem.
    pub preview: bool,
}

impl OrganizeOptions {
    /// Options with the usual defaults: create folders, skip hidden files,
    /// really move.
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
            create_folders: true,
            include_hidden: false,
            preview: false,
        }
    }

    pub fn preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn create_folders(mut self, create_folders: bool) -> Self {
        self.create_folders = create_folders;
        self
    }

    pub fn include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }
}

/// What happened to one candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Moved,
    Previewed,
    Skipped,
    Error,
}

/// One candidate file and its fate.
#[derive(Debug, Clone, Serialize)]
pub struct FileTask {
    /// Where the file was found.
    pub source: PathBuf,
    /// Lowercase extension without the dot; empty if none.
    pub extension: String,
    /// Category the file was classified into.
    pub category: String,
    /// Resolved target path, once known.
    pub destination: Option<PathBuf>,
    pub outcome: Outcome,
    /// Reason for a `Skipped` or `Error` outcome.
    pub detail: Option<String>,
}

impl FileTask {
    fn new(source: PathBuf, extension: String, category: String) -> Self {
        Self {
            source,
            extension,
            category,
            destination: None,
            outcome: Outcome::Pending,
            detail: None,
        }
    }

    fn fail(&mut self, outcome: Outcome, error: &OrganizeError) {
        self.outcome = outcome;
        self.detail = Some(error.to_string());
    }

    /// The file name as shown in log lines, or the whole path if it has none.
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Every candidate was processed.
    Completed,
    /// The base directory was missing or unreadable; nothing was touched.
    Aborted,
    /// Stopped early through the cancel flag.
    Cancelled,
}

/// Aggregate result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub base_directory: PathBuf,
    pub preview: bool,
    pub state: RunState,
    /// Number of candidate files found.
    pub total: usize,
    /// Number of candidates handled, whatever their outcome.
    pub processed: usize,
    pub tasks: Vec<FileTask>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    fn new(options: &OrganizeOptions) -> Self {
        let now = Utc::now();
        Self {
            base_directory: options.base_directory.clone(),
            preview: options.preview,
            state: RunState::Completed,
            total: 0,
            processed: 0,
            tasks: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// An empty result for a run that ended without reaching the engine's end.
    pub(crate) fn interrupted(options: &OrganizeOptions, state: RunState) -> Self {
        Self::new(options).finish(state)
    }

    fn finish(mut self, state: RunState) -> Self {
        self.state = state;
        self.finished_at = Utc::now();
        self
    }

    /// Number of tasks with the given outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.tasks.iter().filter(|t| t.outcome == outcome).count()
    }

    pub fn is_aborted(&self) -> bool {
        self.state == RunState::Aborted
    }

    /// Files moved (or, for a preview, that would be moved) per category.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for task in &self.tasks {
            if matches!(task.outcome, Outcome::Moved | Outcome::Previewed) {
                *counts.entry(task.category.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Runs one organization pass over a directory.
///
/// The engine owns its own copy of the category table, so edits made
/// elsewhere while a run is in flight do not affect it.
///
/// # Examples
///
/// ```no_run
/// use dirsort::file_category::CategoryTable;
/// use dirsort::file_organizer::{OrganizeOptions, OrganizerEngine};
/// use dirsort::observer::NullObserver;
///
/// let options = OrganizeOptions::new("/home/me/Downloads").preview(true);
/// let result = OrganizerEngine::new(options, CategoryTable::default()).run(&mut NullObserver);
/// println!("{} of {} files", result.processed, result.total);
/// ```
pub struct OrganizerEngine {
    options: OrganizeOptions,
    table: CategoryTable,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl OrganizerEngine {
    pub fn new(options: OrganizeOptions, table: CategoryTable) -> Self {
        Self {
            options,
            table,
            cancel_flag: None,
        }
    }

    /// Checks `flag` before each file and stops once it is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Executes the run and returns its result. Never panics on I/O errors.
    pub fn run(&self, observer: &mut dyn Observer) -> RunResult {
        let options = &self.options;
        let base = options.base_directory.as_path();
        let mut result = RunResult::new(options);

        let candidates = match list_candidates(base, options.include_hidden) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "Run aborted");
                observer.on_log(&format!("Error: {}", e));
                observer.on_status("Error occurred");
                return result.finish(RunState::Aborted);
            }
        };

        info!(base = %base.display(), preview = options.preview, "Starting organization");
        observer.on_log(&format!("Starting organization of: {}", base.display()));

        let total = candidates.len();
        result.total = total;

        if total == 0 {
            observer.on_log("No files to process.");
            observer.on_progress(0, 0);
            observer.on_status("Ready");
            return result.finish(RunState::Completed);
        }

        observer.on_log(&format!("Found {} files to process...", total));
        observer.on_progress(0, total);

        for path in candidates {
            if self.is_cancelled() {
                info!(processed = result.processed, total, "Run cancelled");
                observer.on_log(&format!(
                    "Run cancelled after {} of {} files.",
                    result.processed, total
                ));
                observer.on_status("Cancelled");
                return result.finish(RunState::Cancelled);
            }

            let task = self.process_file(path, observer);
            result.tasks.push(task);
            result.processed += 1;

            observer.on_progress(result.processed, total);
            observer.on_status(&format!(
                "Processing... {}/{} files",
                result.processed, total
            ));
        }

        if options.preview {
            observer.on_log("Preview complete. No files were moved.");
            observer.on_status("Preview complete");
        } else {
            observer.on_log(&format!(
                "Organization complete! Processed {} files.",
                result.processed
            ));
            observer.on_status("Ready");
        }

        info!(
            processed = result.processed,
            moved = result.count(Outcome::Moved),
            errors = result.count(Outcome::Error),
            "Organization finished"
        );
        result.finish(RunState::Completed)
    }

    /// Classifies, resolves and moves (or previews) a single file.
    fn process_file(&self, path: PathBuf, observer: &mut dyn Observer) -> FileTask {
        let base = self.options.base_directory.as_path();
        let extension = extensions::extension_of(&path);
        let category = self.table.classify(&extension).to_string();
        let mut task = FileTask::new(path, extension, category);
        let name = task.file_name();

        // read_dir never yields entries without a name.
        let Some(file_name) = task.source.file_name().map(PathBuf::from) else {
            warn!(path = %task.source.display(), "Skipping path without a file name");
            let detail = "path has no file name".to_string();
            observer.on_log(&format!("Skipped {}: {}", name, detail));
            task.outcome = Outcome::Skipped;
            task.detail = Some(detail);
            return task;
        };

        let dest_dir = base.join(&task.category);
        if let Err(e) = self.prepare_destination(&dest_dir) {
            warn!(file = %name, error = %e, "Skipping file");
            observer.on_log(&e.to_string());
            task.fail(Outcome::Skipped, &e);
            return task;
        }

        let target = destination::resolve_os(&dest_dir, &file_name);
        let shown = display_relative(&target, base);
        task.destination = Some(target.clone());

        if self.options.preview {
            debug!(file = %name, target = %target.display(), "Previewed");
            observer.on_log(&format!("[PREVIEW] {} → {}", name, shown));
            task.outcome = Outcome::Previewed;
            return task;
        }

        match move_file(&task.source, &target) {
            Ok(()) => {
                debug!(file = %name, target = %target.display(), "Moved");
                observer.on_log(&format!("Moved: {} → {}", name, shown));
                task.outcome = Outcome::Moved;
            }
            Err(e) => {
                warn!(file = %name, error = %e, "Move failed");
                let detail = match &e {
                    OrganizeError::MoveFailure { source, .. } => source.to_string(),
                    other => other.to_string(),
                };
                observer.on_log(&format!("Error moving {}: {}", name, detail));
                task.fail(Outcome::Error, &e);
            }
        }

        task
    }

    /// Makes sure the category folder is usable.
    ///
    /// A preview never creates anything. A folder it would create counts as
    /// present, unless some other entry already holds the name, in which case
    /// it fails the way the real `create_dir` would.
    fn prepare_destination(&self, dest_dir: &Path) -> OrganizeResult<()> {
        if dest_dir.is_dir() {
            return Ok(());
        }
        if !self.options.create_folders {
            return Err(OrganizeError::DestinationMissing(dest_dir.to_path_buf()));
        }
        if self.options.preview {
            return match fs::symlink_metadata(dest_dir) {
                Ok(_) => Err(OrganizeError::DestinationCreateFailure {
                    path: dest_dir.to_path_buf(),
                    source: io::Error::from(io::ErrorKind::AlreadyExists),
                }),
                Err(_) => Ok(()),
            };
        }

        match fs::create_dir(dest_dir) {
            Ok(()) => {
                debug!(path = %dest_dir.display(), "Created category folder");
                Ok(())
            }
            Err(_) if dest_dir.is_dir() => Ok(()),
            Err(source) => Err(OrganizeError::DestinationCreateFailure {
                path: dest_dir.to_path_buf(),
                source,
            }),
        }
    }
}

/// Runs `options` against `table` once. See [`OrganizerEngine::run`].
pub fn organize(
    options: OrganizeOptions,
    table: CategoryTable,
    observer: &mut dyn Observer,
) -> RunResult {
    OrganizerEngine::new(options, table).run(observer)
}

/// Lists the regular files directly inside `base`, sorted by name.
///
/// Symlinks and directories are not candidates. Dot-prefixed names are left
/// out unless `include_hidden` is set.
pub fn list_candidates(base: &Path, include_hidden: bool) -> OrganizeResult<Vec<PathBuf>> {
    if !base.is_dir() {
        return Err(OrganizeError::BaseDirectoryNotFound(base.to_path_buf()));
    }

    let entries = fs::read_dir(base).map_err(|source| OrganizeError::BaseDirectoryUnreadable {
        path: base.to_path_buf(),
        source,
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_file()))
        .filter(|entry| include_hidden || !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.path())
        .collect();
    candidates.sort();

    Ok(candidates)
}

/// Renames `from` to `to`. Cross-volume moves are not attempted.
fn move_file(from: &Path, to: &Path) -> OrganizeResult<()> {
    fs::rename(from, to).map_err(|source| OrganizeError::MoveFailure {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
