//! dirsort - sort a directory's files into category folders by extension
//!
//! This library provides extension normalization, an ordered category table
//! with JSON persistence, collision-free destination naming, the organization
//! engine with preview mode, and a controller that runs it on a background
//! thread while an observer receives log, progress and status updates.

pub mod category_store;
pub mod cli;
pub mod config;
pub mod controller;
pub mod destination;
pub mod extensions;
pub mod file_category;
pub mod file_organizer;
pub mod observer;
pub mod output;

pub use category_store::{CategoryManager, CategoryStore};
pub use config::{ConfigError, Settings};
pub use controller::{ControllerError, RunController};
pub use file_category::{Category, CategoryError, CategoryTable, OTHERS_CATEGORY};
pub use file_organizer::{
    FileTask, OrganizeError, OrganizeOptions, OrganizerEngine, Outcome, RunResult, RunState,
    organize,
};
pub use observer::Observer;

pub use cli::{Cli, run_cli};
