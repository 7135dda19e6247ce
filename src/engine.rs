use crate::collection::Collection;
use crate::errors::DbError;
use crate::export::{self, ExportOptions};
use crate::import::{self, ImportFormat, ImportOptions};
use crate::index::IndexModel;
use crate::types::Namespace;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SNAPSHOT_EXT: &str = "ndjson";
const INDEXES_SUFFIX: &str = ".indexes.json";

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Snapshot directory. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
}

/// Namespace registry with optional NDJSON snapshots.
///
/// Each collection is stored as `{db}.{collection}.ndjson` plus a
/// `{db}.{collection}.indexes.json` list of index declarations.
pub struct Engine {
    options: EngineOptions,
    collections: RwLock<HashMap<Namespace, Arc<Collection>>>,
    dropped: Mutex<Vec<Namespace>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("collections", &self.collections.read().len())
            .finish()
    }
}

impl Engine {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            options: EngineOptions::default(),
            collections: RwLock::new(HashMap::new()),
            dropped: Mutex::new(Vec::new()),
        }
    }

    /// Opens the engine, loading any snapshots found in `options.data_dir`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or a snapshot is unreadable.
    pub fn open(options: EngineOptions) -> Result<Self, DbError> {
        let engine = Self { options, ..Self::in_memory() };
        if let Some(dir) = engine.options.data_dir.clone() {
            fs::create_dir_all(&dir)?;
            engine.load_snapshots(&dir)?;
        }
        Ok(engine)
    }

    fn load_snapshots(&self, dir: &Path) -> Result<(), DbError> {
        let mut loaded = 0usize;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXT) {
                continue;
            }
            let Some(ns) = path.file_stem().and_then(|s| s.to_str()).and_then(Namespace::parse)
            else {
                log::warn!("ignoring snapshot with unexpected name: {}", path.display());
                continue;
            };
            let col = self.create_collection(&ns);
            let opts = ImportOptions { format: ImportFormat::Ndjson, ..ImportOptions::default() };
            let report = import::import_file(&col, &path, &opts)?;
            for model in read_index_models(&dir.join(format!("{ns}{INDEXES_SUFFIX}")))? {
                col.create_index(model)?;
            }
            log::info!("loaded {ns}: {} documents", report.inserted);
            loaded += 1;
        }
        log::debug!("loaded {loaded} snapshot(s) from {}", dir.display());
        Ok(())
    }

    #[must_use]
    pub fn data_dir(&self) -> Option<&Path> {
        self.options.data_dir.as_deref()
    }

    /// Returns the collection for `ns`, creating it on first use.
    pub fn create_collection(&self, ns: &Namespace) -> Arc<Collection> {
        if let Some(col) = self.collections.read().get(ns) {
            return col.clone();
        }
        let mut cols = self.collections.write();
        cols.entry(ns.clone())
            .or_insert_with(|| {
                log::debug!("creating collection {ns}");
                self.dropped.lock().retain(|d| d != ns);
                Arc::new(Collection::new(ns.clone()))
            })
            .clone()
    }

    pub fn get_collection(&self, ns: &Namespace) -> Option<Arc<Collection>> {
        self.collections.read().get(ns).cloned()
    }

    pub fn drop_collection(&self, ns: &Namespace) -> bool {
        let removed = self.collections.write().remove(ns).is_some();
        if removed {
            log::info!("dropped collection {ns}");
            self.dropped.lock().push(ns.clone());
        }
        removed
    }

    /// All namespaces, sorted.
    pub fn list_namespaces(&self) -> Vec<Namespace> {
        let mut out: Vec<Namespace> = self.collections.read().keys().cloned().collect();
        out.sort();
        out
    }

    pub fn list_collection_names(&self, db: &str) -> Vec<String> {
        self.list_namespaces()
            .into_iter()
            .filter(|ns| ns.db == db)
            .map(|ns| ns.collection)
            .collect()
    }

    /// Writes every collection and its index declarations to the data directory.
    /// No-op for in-memory engines.
    ///
    /// # Errors
    /// Returns an error if a snapshot cannot be written.
    pub fn flush(&self) -> Result<(), DbError> {
        let Some(dir) = self.options.data_dir.as_deref() else {
            return Ok(());
        };
        let cols: Vec<Arc<Collection>> = self.collections.read().values().cloned().collect();
        for col in &cols {
            let ns = col.namespace();
            let report = export::export_file(
                col,
                dir.join(format!("{ns}.{SNAPSHOT_EXT}")),
                &ExportOptions::default(),
            )?;
            write_index_models(&dir.join(format!("{ns}{INDEXES_SUFFIX}")), &col.index_models())?;
            log::debug!("flushed {ns}: {} documents", report.written);
        }
        for ns in self.dropped.lock().drain(..) {
            for name in [format!("{ns}.{SNAPSHOT_EXT}"), format!("{ns}{INDEXES_SUFFIX}")] {
                let path = dir.join(name);
                if path.exists() {
                    fs::remove_file(&path)?;
                }
            }
        }
        log::info!("flushed {} collection(s) to {}", cols.len(), dir.display());
        Ok(())
    }
}

fn read_index_models(path: &Path) -> Result<Vec<IndexModel>, DbError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_index_models(path: &Path, models: &[IndexModel]) -> Result<(), DbError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, models)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|pe| DbError::Io(format!("{}: {}", path.display(), pe.error)))?;
    Ok(())
}
