use crate::document::Document;
use crate::index::IndexManager;
use crate::types::{DocumentId, Namespace};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Documents in insertion order. `seq` is monotonic, so iteration over `docs` is the
/// natural order used by scans and by "first match" operations.
#[derive(Debug, Default)]
pub(crate) struct DocStore {
    pub(crate) next_seq: u64,
    pub(crate) docs: BTreeMap<u64, Document>,
    pub(crate) seq_of: HashMap<DocumentId, u64>,
}

pub struct Collection {
    pub(crate) namespace: Namespace,
    pub(crate) store: RwLock<DocStore>,
    pub indexes: RwLock<IndexManager>,
    pub(crate) build_lock: RwLock<()>,
}

impl Collection {
    #[must_use]
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            store: RwLock::new(DocStore::default()),
            indexes: RwLock::new(IndexManager::new()),
            build_lock: RwLock::new(()),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the collection's short name.
    #[must_use]
    pub fn name_str(&self) -> String {
        self.namespace.collection.clone()
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("namespace", &self.namespace.to_string())
            .field("len", &self.store.read().docs.len())
            .finish_non_exhaustive()
    }
}
