//! Persisting the category table and editing it.
//!
//! The on-disk format is a JSON object mapping each category name to its
//! extensions. Key order is the table order; extensions are written sorted:
//!
//! ```json
//! {
//!   "images": ["gif", "jpg", "png"],
//!   "documents": ["pdf", "txt"]
//! }
//! ```
//!
//! Loading never fails: anything missing, unreadable or malformed degrades
//! to [`CategoryTable::defaults`].

use crate::config::ConfigError;
use crate::file_category::{Category, CategoryError, CategoryTable};
use crate::observer::Observer;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reads and writes the category table at a fixed path.
#[derive(Debug, Clone)]
pub struct CategoryStore {
    path: PathBuf,
}

impl CategoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted table, or the defaults if nothing usable is stored.
    pub fn load(&self) -> CategoryTable {
        match self.try_load() {
            Ok(Some(table)) if !table.is_empty() => {
                debug!(path = %self.path.display(), count = table.len(), "Loaded categories");
                table
            }
            Ok(Some(_)) => {
                debug!(path = %self.path.display(), "No valid categories stored, using defaults");
                CategoryTable::defaults()
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "No category file, using defaults");
                CategoryTable::defaults()
            }
            Err(e) => {
                debug!(error = %e, "Could not load categories, using defaults");
                CategoryTable::defaults()
            }
        }
    }

    fn try_load(&self) -> Result<Option<CategoryTable>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;

        Ok(Some(table_from_json(&value)))
    }

    /// Writes the table through a temporary sibling file, so a failed write
    /// leaves the previous file untouched.
    pub fn save(&self, table: &CategoryTable) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(&table_to_json(table)).map_err(|source| {
            ConfigError::Json {
                path: self.path.clone(),
                source,
            }
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp_path = self.temp_path();
        let write_result = fs::File::create(&tmp_path).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()
        });
        if let Err(e) = write_result.and_then(|()| fs::rename(&tmp_path, &self.path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_err(e));
        }

        info!(path = %self.path.display(), count = table.len(), "Saved categories");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Keeps entries whose value is an array; non-string extensions are dropped.
fn table_from_json(value: &Value) -> CategoryTable {
    let Some(object) = value.as_object() else {
        return CategoryTable::new();
    };

    object
        .iter()
        .filter_map(|(name, exts)| {
            let exts = exts.as_array()?;
            let raw = exts.iter().filter_map(Value::as_str);
            Category::new(name, raw).ok()
        })
        .collect()
}

fn table_to_json(table: &CategoryTable) -> Value {
    let object: Map<String, Value> = table
        .iter()
        .map(|category| {
            let exts = category
                .sorted_extensions()
                .into_iter()
                .map(Value::String)
                .collect();
            (category.name().to_string(), Value::Array(exts))
        })
        .collect();
    Value::Object(object)
}

/// The in-memory category table plus its store.
///
/// Every successful mutation is saved immediately. A failed save is reported
/// to the observer as a warning; the change stays in effect for the session.
#[derive(Debug, Clone)]
pub struct CategoryManager {
    table: CategoryTable,
    store: CategoryStore,
}

impl CategoryManager {
    /// Loads the table from `store` (or the defaults).
    pub fn load(store: CategoryStore) -> Self {
        let table = store.load();
        Self { table, store }
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    pub fn store(&self) -> &CategoryStore {
        &self.store
    }

    /// A copy for a run to work on.
    pub fn snapshot(&self) -> CategoryTable {
        self.table.clone()
    }

    /// Adds a category or replaces the one with the same name.
    ///
    /// # Errors
    ///
    /// Validation errors are reported to the observer and returned; the
    /// table is left unchanged.
    pub fn add_or_update<I, S>(
        &mut self,
        name: &str,
        raw_extensions: I,
        observer: &mut dyn Observer,
    ) -> Result<(), CategoryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let category = match Category::new(name, raw_extensions) {
            Ok(category) => category,
            Err(e) => {
                observer.on_log(&e.to_string());
                return Err(e);
            }
        };

        let message = format!(
            "Saved category '{}' with {} extensions.",
            category.name(),
            category.extensions().len()
        );
        self.table.upsert(category);
        observer.on_log(&message);
        self.save(observer);
        Ok(())
    }

    /// Deletes a category. Returns false (and saves nothing) if it is absent.
    pub fn delete(&mut self, name: &str, observer: &mut dyn Observer) -> bool {
        let name = name.trim();
        if self.table.remove(name).is_none() {
            observer.on_log(&format!("Category '{}' not found.", name));
            return false;
        }

        observer.on_log(&format!("Deleted category '{}'.", name));
        self.save(observer);
        true
    }

    /// Replaces the whole table with the built-in defaults.
    pub fn restore_defaults(&mut self, observer: &mut dyn Observer) {
        self.table = CategoryTable::defaults();
        self.save(observer);
        observer.on_log("Restored default categories.");
    }

    /// Persists the current table, reporting the outcome to the observer.
    pub fn save(&self, observer: &mut dyn Observer) -> bool {
        match self.store.save(&self.table) {
            Ok(()) => {
                observer.on_log(&format!(
                    "Saved categories to {}",
                    self.store.display_name()
                ));
                true
            }
            Err(e) => {
                warn!(error = %e, "Could not save categories");
                observer.on_log(&format!("Could not save config: {}", e));
                false
            }
        }
    }
}
