use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Leading character that marks an entry as not pre-selected.
pub const DESELECT_MARKER: char = '#';

const CATEGORY_EXT: &str = "txt";
const COMMENT_PREFIX: &str = "##";
const TITLE_PREFIX: &str = "###";

/// Catalogs compiled into the binary, used when no catalog directory exists
/// on disk. Entries are `(catalog key, file stem, contents)` in file order.
const BUNDLED: &[(&str, &str, &str)] = &[
    ("packages", "01-base", include_str!("../../catalogs/packages/01-base.txt")),
    ("packages", "02-desktop", include_str!("../../catalogs/packages/02-desktop.txt")),
    ("packages", "03-editors", include_str!("../../catalogs/packages/03-editors.txt")),
    ("vscode", "01-languages", include_str!("../../catalogs/vscode/01-languages.txt")),
    ("vscode", "02-tools", include_str!("../../catalogs/vscode/02-tools.txt")),
];

/// A named group of entries read from one catalog file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub key: String,
    /// Raw entries in file order, deselect markers still attached.
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub display_name: String,
    pub preselected: bool,
}

impl Item {
    pub fn parse(entry: &str) -> Self {
        match entry.strip_prefix(DESELECT_MARKER) {
            Some(rest) => Self {
                display_name: rest.trim().to_string(),
                preselected: false,
            },
            None => Self {
                display_name: entry.to_string(),
                preselected: true,
            },
        }
    }
}

/// Source of the categories making up a catalog.
pub trait CatalogProvider {
    fn list_categories(&self, catalog_key: &str) -> Result<Vec<Category>>;
}

/// The sample catalogs shipped inside the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledCatalog;

impl CatalogProvider for BundledCatalog {
    fn list_categories(&self, catalog_key: &str) -> Result<Vec<Category>> {
        let categories: Vec<Category> = BUNDLED
            .iter()
            .filter(|(key, _, _)| *key == catalog_key)
            .map(|(_, stem, raw)| parse_category(stem, raw))
            .collect();
        if categories.is_empty() {
            return Err(Error::catalog_read(catalog_key, "no bundled catalog"));
        }
        Ok(categories)
    }
}

/// Reads `<root>/<catalog_key>/*.txt`, one category per file. Falls back to
/// [`BundledCatalog`] while `root` itself does not exist.
#[derive(Debug, Clone)]
pub struct DirCatalog {
    root: PathBuf,
}

impl DirCatalog {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn category_files(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(Error::catalog_read(dir, "not a directory"));
        }

        let mut files = Vec::new();
        for entry in WalkBuilder::new(dir)
            .max_depth(Some(1))
            .hidden(false)
            .git_ignore(false)
            .build()
        {
            let entry = entry.map_err(|err| Error::catalog_read(dir, err))?;
            let path = entry.path();
            let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
            if is_file && path.extension().is_some_and(|ext| ext == CATEGORY_EXT) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    fn read_category(path: &Path) -> Result<Category> {
        let raw = fs::read_to_string(path).map_err(|err| Error::catalog_read(path, err))?;
        let key = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(parse_category(&key, &raw))
    }
}

fn parse_category(key: &str, raw: &str) -> Category {
    let mut title = None;
    let mut entries = Vec::new();
    for line in raw.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix(TITLE_PREFIX) {
            title.get_or_insert_with(|| rest.trim().to_string());
            continue;
        }
        if line.starts_with(COMMENT_PREFIX) {
            continue;
        }
        entries.push(line.to_string());
    }

    Category {
        name: title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| key.to_string()),
        key: key.to_string(),
        entries,
    }
}

impl CatalogProvider for DirCatalog {
    fn list_categories(&self, catalog_key: &str) -> Result<Vec<Category>> {
        if !self.root.exists() {
            tracing::debug!(
                "{} does not exist, using bundled {catalog_key} catalog",
                self.root.display()
            );
            return BundledCatalog.list_categories(catalog_key);
        }

        let dir = self.root.join(catalog_key);
        let categories = Self::category_files(&dir)?
            .iter()
            .map(|path| Self::read_category(path))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "read {} categories from {}",
            categories.len(),
            dir.display()
        );
        Ok(categories)
    }
}
