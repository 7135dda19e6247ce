//! Connection handles: `Client` -> `Database` -> `CollectionRef`.
//!
//! A client owns one engine. `memory://` keeps data in process, `file://<dir>` (or a
//! bare directory path) loads NDJSON snapshots on connect and writes them back on
//! close. Once closed, every handle derived from the client fails with
//! `DbError::ClientClosed`.

use crate::aggregate::{self, Pipeline};
use crate::collection::Collection;
use crate::document::Document;
use crate::engine::{Engine, EngineOptions};
use crate::errors::DbError;
use crate::export::{self, ExportOptions, ExportReport};
use crate::import::{self, ImportOptions, ImportReport};
use crate::index::{IndexDescriptor, IndexModel};
use crate::query::{
    self, DeleteReport, ExplainReport, FindOptions, UpdateReport, parse_filter, parse_update,
};
use crate::types::{DocumentId, Namespace};
use bson::Document as BsonDocument;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    Memory,
    Directory(PathBuf),
}

impl ConnectionTarget {
    /// # Errors
    /// Returns `Connection` for empty URIs and unsupported schemes.
    pub fn parse(uri: &str) -> Result<Self, DbError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(DbError::Connection("connection URI is empty".into()));
        }
        match uri.split_once("://") {
            Some(("memory", _)) => Ok(Self::Memory),
            Some(("file", "")) => Err(DbError::Connection("file:// URI needs a directory".into())),
            Some(("file", dir)) => Ok(Self::Directory(PathBuf::from(dir))),
            Some((scheme, _)) => Err(DbError::Connection(format!(
                "unsupported scheme {scheme}:// (expected memory:// or file://<dir>)"
            ))),
            None => Ok(Self::Directory(PathBuf::from(uri))),
        }
    }
}

struct ClientInner {
    uri: String,
    engine: Engine,
    closed: AtomicBool,
}

impl ClientInner {
    fn ensure_open(&self) -> Result<(), DbError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::ClientClosed);
        }
        Ok(())
    }
}

pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("uri", &self.inner.uri)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Client {
    /// Connects to the store named by `uri`.
    ///
    /// # Errors
    /// Returns `Connection` for bad URIs, or the engine's error if snapshots cannot load.
    pub fn connect(uri: &str) -> Result<Self, DbError> {
        let engine = match ConnectionTarget::parse(uri)? {
            ConnectionTarget::Memory => Engine::in_memory(),
            ConnectionTarget::Directory(dir) => Engine::open(EngineOptions { data_dir: Some(dir) })
                .map_err(|e| DbError::Connection(format!("{uri}: {e}")))?,
        };
        log::info!("connected to {uri}");
        Ok(Self {
            inner: Arc::new(ClientInner {
                uri: uri.to_string(),
                engine,
                closed: AtomicBool::new(false),
            }),
        })
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    #[must_use]
    pub fn database(&self, name: &str) -> Database {
        Database { client: self.inner.clone(), name: name.to_string() }
    }

    /// # Errors
    /// Returns `ClientClosed` after `close`.
    pub fn list_database_names(&self) -> Result<Vec<String>, DbError> {
        self.inner.ensure_open()?;
        let mut names: Vec<String> =
            self.inner.engine.list_namespaces().into_iter().map(|ns| ns.db).collect();
        names.dedup();
        Ok(names)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Flushes snapshots and marks the client closed. Calling it again is a no-op.
    ///
    /// # Errors
    /// Returns the flush error; the client is closed either way.
    pub fn close(&self) -> Result<(), DbError> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let res = self.inner.engine.flush();
        log::info!("connection to {} closed", self.inner.uri);
        res
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("closing {} on drop failed: {e}", self.inner.uri);
        }
    }
}

#[derive(Clone)]
pub struct Database {
    client: Arc<ClientInner>,
    name: String,
}

impl Database {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn collection(&self, name: &str) -> CollectionRef {
        CollectionRef { client: self.client.clone(), ns: Namespace::new(&self.name, name) }
    }

    /// # Errors
    /// Returns `ClientClosed` after `close`.
    pub fn list_collection_names(&self) -> Result<Vec<String>, DbError> {
        self.client.ensure_open()?;
        Ok(self.client.engine.list_collection_names(&self.name))
    }

    /// # Errors
    /// Returns `ClientClosed` after `close`.
    pub fn drop_collection(&self, name: &str) -> Result<bool, DbError> {
        self.client.ensure_open()?;
        Ok(self.client.engine.drop_collection(&Namespace::new(&self.name, name)))
    }
}

/// Handle to one collection. The collection is created on first use.
#[derive(Clone)]
pub struct CollectionRef {
    client: Arc<ClientInner>,
    ns: Namespace,
}

impl std::fmt::Debug for CollectionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CollectionRef({})", self.ns)
    }
}

impl CollectionRef {
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.ns
    }

    fn handle(&self) -> Result<Arc<Collection>, DbError> {
        self.client.ensure_open()?;
        Ok(self.client.engine.create_collection(&self.ns))
    }

    /// # Errors
    /// Returns `ClientClosed` after `close`.
    pub fn insert_one(&self, doc: BsonDocument) -> Result<DocumentId, DbError> {
        Ok(self.handle()?.insert_document(Document::new(doc)))
    }

    /// # Errors
    /// Returns `ClientClosed` after `close`.
    pub fn insert_many(
        &self,
        docs: impl IntoIterator<Item = BsonDocument>,
    ) -> Result<Vec<DocumentId>, DbError> {
        let col = self.handle()?;
        Ok(docs.into_iter().map(|d| col.insert_document(Document::new(d))).collect())
    }

    /// Materialized find.
    ///
    /// # Errors
    /// Returns `QueryError` for a malformed filter or options over their caps, or `ClientClosed`.
    pub fn find(
        &self,
        filter: &BsonDocument,
        opts: &FindOptions,
    ) -> Result<Vec<BsonDocument>, DbError> {
        let filter = parse_filter(filter)?;
        opts.validate()?;
        let col = self.handle()?;
        Ok(query::find_docs(&col, &filter, opts).into_documents())
    }

    /// # Errors
    /// Returns `QueryError` for a malformed filter, or `ClientClosed`.
    pub fn find_one(&self, filter: &BsonDocument) -> Result<Option<BsonDocument>, DbError> {
        let opts = FindOptions { limit: Some(1), ..FindOptions::default() };
        Ok(self.find(filter, &opts)?.into_iter().next())
    }

    /// # Errors
    /// Returns `QueryError` for a malformed filter, or `ClientClosed`.
    pub fn count(&self, filter: &BsonDocument) -> Result<u64, DbError> {
        let filter = parse_filter(filter)?;
        let col = self.handle()?;
        let n = query::count_docs(&col, &filter);
        Ok(crate::utils::num::usize_to_u64(n))
    }

    /// # Errors
    /// Returns `QueryError` for a malformed filter or update, or one that cannot
    /// apply to the match, or `ClientClosed`.
    pub fn update_one(
        &self,
        filter: &BsonDocument,
        update: &BsonDocument,
    ) -> Result<UpdateReport, DbError> {
        let (filter, update) = (parse_filter(filter)?, parse_update(update)?);
        let col = self.handle()?;
        query::update_one(&col, &filter, &update)
    }

    /// # Errors
    /// Returns `QueryError` for a malformed filter or update, or one that cannot
    /// apply to some match, or `ClientClosed`.
    pub fn update_many(
        &self,
        filter: &BsonDocument,
        update: &BsonDocument,
    ) -> Result<UpdateReport, DbError> {
        let (filter, update) = (parse_filter(filter)?, parse_update(update)?);
        let col = self.handle()?;
        query::update_many(&col, &filter, &update)
    }

    /// # Errors
    /// Returns `QueryError` for a malformed filter, or `ClientClosed`.
    pub fn delete_one(&self, filter: &BsonDocument) -> Result<DeleteReport, DbError> {
        let filter = parse_filter(filter)?;
        let col = self.handle()?;
        Ok(query::delete_one(&col, &filter))
    }

    /// # Errors
    /// Returns `QueryError` for a malformed filter, or `ClientClosed`.
    pub fn delete_many(&self, filter: &BsonDocument) -> Result<DeleteReport, DbError> {
        let filter = parse_filter(filter)?;
        let col = self.handle()?;
        Ok(query::delete_many(&col, &filter))
    }

    /// # Errors
    /// Returns `QueryError` for a malformed pipeline or a failing expression.
    pub fn aggregate(&self, pipeline: &[BsonDocument]) -> Result<Vec<BsonDocument>, DbError> {
        let pipeline = Pipeline::from_documents(pipeline)?;
        let col = self.handle()?;
        aggregate::aggregate(&col, &pipeline)
    }

    /// # Errors
    /// Returns `IndexError` on a conflicting declaration, or `ClientClosed`.
    pub fn create_index(&self, model: IndexModel) -> Result<String, DbError> {
        self.handle()?.create_index(model)
    }

    /// # Errors
    /// Returns `ClientClosed` after `close`.
    pub fn list_indexes(&self) -> Result<Vec<IndexDescriptor>, DbError> {
        Ok(self.handle()?.list_indexes())
    }

    /// # Errors
    /// Returns `ClientClosed` after `close`.
    pub fn drop_index(&self, name: &str) -> Result<bool, DbError> {
        Ok(self.handle()?.drop_index(name))
    }

    /// Loads a seed file (NDJSON or a JSON array) into the collection.
    ///
    /// # Errors
    /// Returns the import error, or `ClientClosed`.
    pub fn import_file(&self, path: &Path, opts: &ImportOptions) -> Result<ImportReport, DbError> {
        let col = self.handle()?;
        import::import_file(&col, path, opts)
    }

    /// Writes the collection to `path` as NDJSON.
    ///
    /// # Errors
    /// Returns the export error, or `ClientClosed`.
    pub fn export_file(&self, path: &Path, opts: &ExportOptions) -> Result<ExportReport, DbError> {
        let col = self.handle()?;
        export::export_file(&col, path, opts)
    }

    /// Executes the find and reports its plan and counters.
    ///
    /// # Errors
    /// Returns `QueryError` for a malformed filter, or `ClientClosed`.
    pub fn explain(
        &self,
        filter: &BsonDocument,
        opts: &FindOptions,
    ) -> Result<ExplainReport, DbError> {
        let filter = parse_filter(filter)?;
        opts.validate()?;
        let col = self.handle()?;
        Ok(query::explain_find(&col, &filter, opts))
    }
}
