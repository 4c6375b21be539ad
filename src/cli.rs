//! Command-line interface module for dirsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing (clap)
//! - Merging settings-file defaults with flags
//! - Driving a run through the [`RunController`] with a console observer
//! - Category management subcommands

use crate::category_store::{CategoryManager, CategoryStore};
use crate::config::Settings;
use crate::controller::RunController;
use crate::extensions::parse_extension_list;
use crate::file_organizer::{OrganizeOptions, RunState};
use crate::output::{ConsoleObserver, OutputFormatter};
use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Sort the files of a directory into category subfolders by extension.
#[derive(Debug, Parser)]
#[command(name = "dirsort", version, about)]
pub struct Cli {
    /// Settings file (TOML). Defaults to ./.dirsortrc.toml, then
    /// ~/.config/dirsort/config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Category table file (JSON), overriding the settings file.
    #[arg(long, global = true, value_name = "FILE")]
    pub categories: Option<PathBuf>,

    /// Increase diagnostic logging on stderr (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Represents a CLI command to execute.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Organize the files of a directory.
    Organize(OrganizeArgs),
    /// Inspect or edit the category table.
    #[command(subcommand)]
    Categories(CategoriesCommand),
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// The directory to organize.
    pub directory: PathBuf,

    /// Show what would be moved without changing anything.
    #[arg(short, long)]
    pub preview: bool,

    /// Create missing category folders (default unless configured otherwise).
    #[arg(long, conflicts_with = "no_create_folders")]
    pub create_folders: bool,

    /// Skip files whose category folder does not exist yet.
    #[arg(long)]
    pub no_create_folders: bool,

    /// Also organize dot-prefixed files.
    #[arg(long)]
    pub include_hidden: bool,

    /// Print the run result as JSON instead of progress output.
    #[arg(long)]
    pub json: bool,
}

impl OrganizeArgs {
    /// Flags win over the settings file.
    pub fn to_options(&self, settings: &Settings) -> OrganizeOptions {
        let defaults = settings.organize;
        let create_folders = if self.no_create_folders {
            false
        } else {
            self.create_folders || defaults.create_folders
        };

        OrganizeOptions {
            base_directory: self.directory.clone(),
            create_folders,
            include_hidden: self.include_hidden || defaults.include_hidden,
            preview: self.preview || defaults.preview,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CategoriesCommand {
    /// List categories in classification order.
    List,
    /// Add a category or replace its extensions.
    Set {
        name: String,
        /// Comma-separated extensions, e.g. "jpg, .png, GIF".
        extensions: String,
    },
    /// Delete a category.
    Delete { name: String },
    /// Replace all categories with the built-in defaults.
    Restore,
}

/// Runs the parsed command line.
///
/// Problems already shown to the user (an aborted run, a rejected category
/// edit) yield `ExitCode::FAILURE`; anything else is returned as an error.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use dirsort::cli::{run_cli, Cli};
///
/// let cli = Cli::parse_from(["dirsort", "organize", "/path/to/directory", "--preview"]);
/// let code = run_cli(&cli).expect("dirsort failed");
/// ```
pub fn run_cli(cli: &Cli) -> Result<ExitCode> {
    let settings = Settings::load(cli.config.as_deref()).context("Error loading settings")?;
    let categories_path = cli
        .categories
        .clone()
        .unwrap_or_else(|| settings.categories_path());
    let manager = CategoryManager::load(CategoryStore::new(categories_path));

    match &cli.command {
        Command::Organize(args) => organize_directory(args, &settings, &manager),
        Command::Categories(command) => manage_categories(command, manager),
    }
}

/// Organizes a directory on a background run and renders it on the terminal.
pub fn organize_directory(
    args: &OrganizeArgs,
    settings: &Settings,
    manager: &CategoryManager,
) -> Result<ExitCode> {
    let options = args.to_options(settings);
    let mut observer = if args.json {
        ConsoleObserver::quiet()
    } else {
        ConsoleObserver::new()
    };

    if options.preview && !args.json {
        OutputFormatter::preview("[PREVIEW] No files will be moved.");
    }

    let mut controller = RunController::new();
    controller
        .start(options, manager.table(), &mut observer)
        .context("Could not start organization")?;
    let result = controller
        .wait(&mut observer)
        .context("Organization run ended without a result")?;

    if args.json {
        let json = serde_json::to_string_pretty(&result).context("Could not serialize result")?;
        println!("{}", json);
    } else if result.state != RunState::Aborted && result.total > 0 {
        OutputFormatter::summary_table(&result.category_counts(), result.preview);
    }

    Ok(if result.is_aborted() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Runs a `categories` subcommand. Edits are saved immediately.
pub fn manage_categories(
    command: &CategoriesCommand,
    mut manager: CategoryManager,
) -> Result<ExitCode> {
    let mut observer = ConsoleObserver::new();

    match command {
        CategoriesCommand::List => {
            OutputFormatter::header(&format!(
                "Categories ({})",
                manager.store().path().display()
            ));
            for (index, category) in manager.table().iter().enumerate() {
                println!(
                    "{:>2}. {:<14} {}",
                    index + 1,
                    category.name(),
                    category.extensions().join(", ")
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        CategoriesCommand::Set { name, extensions } => {
            let raw = parse_extension_list(extensions);
            match manager.add_or_update(name, raw, &mut observer) {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(_) => Ok(ExitCode::FAILURE),
            }
        }
        CategoriesCommand::Delete { name } => Ok(if manager.delete(name, &mut observer) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }),
        CategoriesCommand::Restore => {
            manager.restore_defaults(&mut observer);
            Ok(ExitCode::SUCCESS)
        }
    }
}
