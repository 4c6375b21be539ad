//! Terminal rendering for dirsort.
//!
//! [`OutputFormatter`] holds the styled one-line printers, the run progress
//! bar and the per-category summary. [`ConsoleObserver`] is the terminal
//! implementation of the [`Observer`] contract.

use crate::observer::Observer;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Styled console output.
///
/// Errors go to stderr, everything else to stdout.
pub struct OutputFormatter;

impl OutputFormatter {
    /// A completed action, e.g. a moved file or a saved table.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// OutputFormatter::success("Moved: report.pdf → documents/report.pdf");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    /// Something the user should look at that did not stop the run.
    pub fn warning(message: &str) {
        println!("{} {}", "!".yellow().bold(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{message}");
    }

    pub fn header(title: &str) {
        println!("\n{}", title.bold().underline());
    }

    /// A dry-run line; nothing on disk changed.
    pub fn preview(message: &str) {
        println!("{}", message.yellow());
    }

    /// Progress bar for a run over `total` files; the message slot shows
    /// the run status.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {bar:36.green/white} {pos:>5}/{len:5} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::new(total);
        bar.set_style(style);
        bar
    }

    /// Prints how many files each category received (or would receive, for
    /// a preview) with its share of the total.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let counts = BTreeMap::from([("documents".to_string(), 15), ("images".to_string(), 5)]);
    /// OutputFormatter::summary_table(&counts, false);
    /// ```
    pub fn summary_table(category_counts: &BTreeMap<String, usize>, preview: bool) {
        let total: usize = category_counts.values().sum();
        let title = if preview { "WOULD SORT" } else { "SORTED" };
        Self::header(title);

        let name_width = category_counts
            .keys()
            .map(String::len)
            .chain(std::iter::once("Category".len()))
            .max()
            .unwrap_or_default();
        let rule = "─".repeat(name_width + 20);

        println!(
            "{:<name_width$}  {:>6}  {:>6}",
            "Category".bold(),
            "Files".bold(),
            "Share".bold()
        );
        println!("{}", rule.dimmed());
        for (category, &count) in category_counts {
            println!(
                "{:<name_width$}  {:>6}  {:>5.1}%",
                category,
                count.to_string().green(),
                percent(count, total)
            );
        }
        println!("{}", rule.dimmed());
        println!(
            "{:<name_width$}  {:>6}  {}",
            "Total".bold(),
            total.to_string().green().bold(),
            plural_files(total)
        );
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

fn plural_files(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Renders run events on the terminal.
///
/// Log lines are styled by their prefix; progress drives an indicatif bar
/// whose message is the latest status text.
#[derive(Default)]
pub struct ConsoleObserver {
    progress: Option<ProgressBar>,
    quiet: bool,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppresses log lines and the progress bar (used with `--json`).
    pub fn quiet() -> Self {
        Self {
            progress: None,
            quiet: true,
        }
    }

    fn print_line(message: &str) {
        if message.starts_with("Error") {
            OutputFormatter::error(message);
        } else if message.starts_with("Could not") || message.starts_with("Destination folder") {
            OutputFormatter::warning(message);
        } else if message.starts_with("[PREVIEW]") {
            OutputFormatter::preview(message);
        } else if message.starts_with("Moved:") || message.starts_with("Saved") {
            OutputFormatter::success(message);
        } else if message.starts_with("Starting") {
            OutputFormatter::info(message);
        } else {
            OutputFormatter::plain(message);
        }
    }

    fn clear_progress(&mut self) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }
}

impl Observer for ConsoleObserver {
    fn on_log(&mut self, message: &str) {
        if self.quiet {
            return;
        }
        match &self.progress {
            Some(pb) => pb.suspend(|| Self::print_line(message)),
            None => Self::print_line(message),
        }
    }

    fn on_progress(&mut self, processed: usize, total: usize) {
        if self.quiet {
            return;
        }
        if total == 0 {
            self.clear_progress();
            return;
        }
        let pb = self
            .progress
            .get_or_insert_with(|| OutputFormatter::create_progress_bar(total as u64));
        pb.set_length(total as u64);
        pb.set_position(processed as u64);
    }

    fn on_status(&mut self, text: &str) {
        if let Some(pb) = &self.progress {
            pb.set_message(text.to_string());
        }
    }

    fn on_run_complete(&mut self) {
        self.clear_progress();
    }
}

impl Drop for ConsoleObserver {
    fn drop(&mut self) {
        self.clear_progress();
    }
}
