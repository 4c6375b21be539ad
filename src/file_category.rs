/// Category table and extension-based classification.
///
/// A [`CategoryTable`] is an explicitly ordered list of [`Category`] entries.
/// Order matters: [`CategoryTable::classify`] returns the first category that
/// claims an extension, so two categories listing the same extension always
/// resolve the same way.
///
/// # Examples
///
/// ```
/// use dirsort::file_category::{CategoryTable, OTHERS_CATEGORY};
///
/// let table = CategoryTable::default();
/// assert_eq!(table.classify("png"), "images");
/// assert_eq!(table.classify("mp3"), "audio");
/// assert_eq!(table.classify("xyz"), OTHERS_CATEGORY);
/// ```
use crate::extensions;
use std::collections::HashSet;
use std::path::{Component, Path};
use thiserror::Error;

/// Folder used for files whose extension no category claims.
pub const OTHERS_CATEGORY: &str = "others";

/// Built-in categories, in classification order.
const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("images", &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"]),
    (
        "documents",
        &["txt", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx"],
    ),
    ("archives", &["zip", "rar", "tar", "gz", "7z"]),
    ("audio", &["mp3", "wav", "flac", "aac", "ogg"]),
    ("video", &["mp4", "avi", "mkv", "mov", "wmv"]),
    ("code", &["py", "js", "html", "css", "java", "cpp", "c", "php"]),
    ("executables", &["exe", "msi", "app", "bat"]),
];

/// Validation failures when editing the category table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    /// The category name is blank after trimming.
    #[error("Category name cannot be empty.")]
    EmptyName,
    /// The name cannot be used as a single folder name.
    #[error("Category name '{0}' cannot be used as a folder name.")]
    InvalidName(String),
    /// Normalization left no extensions.
    #[error("Provide at least one extension.")]
    NoValidExtensions,
}

/// A named bucket of extensions, mapped to a subfolder of the same name.
#[derive(Debug, Clone)]
pub struct Category {
    name: String,
    extensions: Vec<String>,
}

impl Category {
    /// Builds a category, validating the name and normalizing the extensions.
    ///
    /// # Errors
    ///
    /// Returns [`CategoryError::EmptyName`], [`CategoryError::InvalidName`] or
    /// [`CategoryError::NoValidExtensions`]; no partially-valid category is
    /// ever produced.
    pub fn new<I, S>(name: &str, raw_extensions: I) -> Result<Self, CategoryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = validate_name(name)?;
        let extensions = extensions::normalize(raw_extensions);
        if extensions.is_empty() {
            return Err(CategoryError::NoValidExtensions);
        }
        Ok(Self { name, extensions })
    }

    /// The category name, which is also its folder name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized extensions in first-seen order.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Extensions sorted alphabetically, as written to disk.
    pub fn sorted_extensions(&self) -> Vec<String> {
        let mut sorted = self.extensions.clone();
        sorted.sort();
        sorted
    }

    /// Returns true if this category claims the (already normalized) extension.
    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.iter().any(|ext| ext == extension)
    }
}

// Extension order is for display only.
impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.extensions.iter().collect::<HashSet<_>>()
                == other.extensions.iter().collect::<HashSet<_>>()
    }
}

impl Eq for Category {}

fn validate_name(raw: &str) -> Result<String, CategoryError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(CategoryError::EmptyName);
    }

    // The name is joined onto the base directory, so it must be exactly one
    // normal path component.
    let mut components = Path::new(name).components();
    let single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();
    if !single_normal || name.contains('/') || name.contains('\\') {
        return Err(CategoryError::InvalidName(name.to_string()));
    }

    Ok(name.to_string())
}

/// Ordered collection of categories with unique names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl CategoryTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            categories: Vec::new(),
        }
    }

    /// The built-in seven-category table.
    pub fn defaults() -> Self {
        let mut table = Self::new();
        for (name, exts) in DEFAULT_CATEGORIES {
            // Built-in entries are always valid.
            if let Ok(category) = Category::new(name, exts.iter()) {
                table.upsert(category);
            }
        }
        table
    }

    /// Inserts a category, replacing an existing one with the same name in place.
    pub fn upsert(&mut self, category: Category) {
        match self
            .categories
            .iter_mut()
            .find(|existing| existing.name == category.name)
        {
            Some(existing) => *existing = category,
            None => self.categories.push(category),
        }
    }

    /// Removes a category by name, returning it if it existed.
    pub fn remove(&mut self, name: &str) -> Option<Category> {
        let index = self.categories.iter().position(|c| c.name == name)?;
        Some(self.categories.remove(index))
    }

    /// Looks a category up by name.
    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Categories in classification order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Returns the name of the first category claiming `extension`, or
    /// [`OTHERS_CATEGORY`].
    ///
    /// `extension` must already be lowercase and dot-less, as produced by
    /// [`extensions::extension_of`].
    pub fn classify(&self, extension: &str) -> &str {
        self.categories
            .iter()
            .find(|category| category.contains(extension))
            .map(Category::name)
            .unwrap_or(OTHERS_CATEGORY)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::defaults()
    }
}

impl FromIterator<Category> for CategoryTable {
    fn from_iter<T: IntoIterator<Item = Category>>(iter: T) -> Self {
        let mut table = Self::new();
        for category in iter {
            table.upsert(category);
        }
        table
    }
}
