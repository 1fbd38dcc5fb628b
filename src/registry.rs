//! Dataset discovery and the process-wide table cache

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use polars::prelude::*;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::schema::TABULAR_EXTENSIONS;

static GLOBAL: Lazy<DatasetRegistry> = Lazy::new(DatasetRegistry::new);

/// A file that looked tabular but failed to parse
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

/// Immutable result of one directory scan
#[derive(Debug)]
pub struct Catalog {
    dir: PathBuf,
    tables: BTreeMap<String, DataFrame>,
    skipped: Vec<SkippedFile>,
}

impl Catalog {
    /// Directory this catalog was scanned from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self, name: &str) -> Option<&DataFrame> {
        self.tables.get(name)
    }

    /// Look up several tables at once, reporting every absent name
    pub fn require(&self, names: &[&str]) -> Result<Vec<&DataFrame>> {
        let mut missing: Vec<String> = names
            .iter()
            .filter(|name| !self.tables.contains_key(**name))
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            return Err(Error::MissingTables(missing));
        }

        Ok(names.iter().map(|name| &self.tables[*name]).collect())
    }

    /// Table names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Files that were recognized but could not be parsed
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }
}

/// Cache of scanned directories
///
/// Each directory maps to an `Arc<Catalog>`. A reload scans outside the lock
/// and then swaps the entry, so readers holding the previous catalog keep a
/// consistent view.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    catalogs: RwLock<HashMap<PathBuf, Arc<Catalog>>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process
    pub fn global() -> &'static DatasetRegistry {
        &GLOBAL
    }

    /// Scan `dir` and replace whatever was cached for it
    pub fn load(&self, dir: impl AsRef<Path>) -> Result<Arc<Catalog>> {
        let key = cache_key(dir.as_ref())?;
        let catalog = Arc::new(scan_directory(&key)?);

        self.catalogs.write().insert(key, Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Return the cached catalog for `dir`, scanning it on first use
    pub fn get_or_load(&self, dir: impl AsRef<Path>) -> Result<Arc<Catalog>> {
        let key = cache_key(dir.as_ref())?;
        if let Some(catalog) = self.catalogs.read().get(&key) {
            return Ok(Arc::clone(catalog));
        }
        self.load(key)
    }

    /// Cached catalog for `dir`, without scanning
    pub fn cached(&self, dir: impl AsRef<Path>) -> Option<Arc<Catalog>> {
        let key = fs::canonicalize(dir.as_ref()).ok()?;
        self.catalogs.read().get(&key).cloned()
    }
}

fn cache_key(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        tracing::error!(path = %dir.display(), "dataset directory not found");
        return Err(Error::Configuration {
            path: dir.to_path_buf(),
        });
    }
    Ok(fs::canonicalize(dir)?)
}

/// Parse every recognized file directly under `dir`
fn scan_directory(dir: &Path) -> Result<Catalog> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_tabular(path))
        .collect();
    candidates.sort();

    let mut tables = BTreeMap::new();
    let mut skipped = Vec::new();

    for path in candidates {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        match read_table(&path) {
            Ok(df) => {
                tracing::debug!(table = %name, rows = df.height(), columns = df.width(), "parsed table");
                tables.insert(name, df);
            }
            Err(err) => {
                tracing::warn!(file = %name, error = %err, "skipping unreadable file");
                skipped.push(SkippedFile {
                    file: name,
                    reason: err.to_string(),
                });
            }
        }
    }

    tracing::info!(
        dir = %dir.display(),
        tables = tables.len(),
        skipped = skipped.len(),
        "dataset directory scanned"
    );

    Ok(Catalog {
        dir: dir.to_path_buf(),
        tables,
        skipped,
    })
}

fn is_tabular(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            TABULAR_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Read one CSV file with a header row, inferring types over the whole file
fn read_table(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|err| Error::Parse {
            file: path.display().to_string(),
            reason: err.to_string(),
        })?;

    if df.width() == 0 {
        return Err(Error::Parse {
            file: path.display().to_string(),
            reason: "no columns".to_string(),
        });
    }

    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) {
        let mut file = File::create(dir.path().join(name)).unwrap();
        write!(file, "{}", contents).unwrap();
    }

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "orders_dataset.csv", "order_id,customer_id\no1,c1\no2,c2\n");
        write_file(&dir, "customers_dataset.csv", "customer_id,customer_state\nc1,SP\n");
        write_file(&dir, "notes.txt", "not a table\n");
        dir
    }

    #[test]
    fn test_load_recognized_files() {
        let dir = create_test_dir();
        let registry = DatasetRegistry::new();

        let catalog = registry.load(dir.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.names().collect::<Vec<_>>(),
            vec!["customers_dataset.csv", "orders_dataset.csv"]
        );
        assert_eq!(catalog.get("orders_dataset.csv").unwrap().height(), 2);
        assert!(catalog.get("notes.txt").is_none());
        assert!(catalog.skipped().is_empty());
    }

    #[test]
    fn test_unparseable_file_is_skipped() {
        let dir = create_test_dir();
        write_file(&dir, "broken.csv", "");

        let catalog = DatasetRegistry::new().load(dir.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.skipped().len(), 1);
        assert_eq!(catalog.skipped()[0].file, "broken.csv");
    }

    #[test]
    fn test_extension_match_ignores_case() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "UPPER.CSV", "a,b\n1,2\n");

        let catalog = DatasetRegistry::new().load(dir.path()).unwrap();
        assert!(catalog.get("UPPER.CSV").is_some());
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        let result = DatasetRegistry::new().load(&missing);
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_reload_publishes_new_catalog() {
        let dir = create_test_dir();
        let registry = DatasetRegistry::new();

        let first = registry.get_or_load(dir.path()).unwrap();
        let again = registry.get_or_load(dir.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        write_file(&dir, "order_payments_dataset.csv", "order_id,payment_value\no1,10.5\n");
        let reloaded = registry.load(dir.path()).unwrap();

        // the reader holding the old catalog still sees the old mapping
        assert_eq!(first.len(), 2);
        assert_eq!(reloaded.len(), 3);
        assert!(Arc::ptr_eq(&registry.cached(dir.path()).unwrap(), &reloaded));
    }

    #[test]
    fn test_require_reports_all_missing() {
        let dir = create_test_dir();
        let catalog = DatasetRegistry::new().load(dir.path()).unwrap();

        match catalog.require(&["payments.csv", "orders_dataset.csv", "geo.csv"]) {
            Err(Error::MissingTables(names)) => {
                assert_eq!(names, vec!["geo.csv".to_string(), "payments.csv".to_string()]);
            }
            other => panic!("expected MissingTables, got {:?}", other.map(|t| t.len())),
        }

        let found = catalog.require(&["orders_dataset.csv"]).unwrap();
        assert_eq!(found.len(), 1);
    }
}
