use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type DatabaseName = String;
pub type CollectionName = String;

/// Engine-assigned handle of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fully qualified collection name, `{db}.{collection}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    pub db: DatabaseName,
    pub collection: CollectionName,
}

impl Namespace {
    #[must_use]
    pub fn new(db: &str, collection: &str) -> Self {
        Self { db: db.to_string(), collection: collection.to_string() }
    }

    /// Parses `db.collection`; the collection part may itself contain dots.
    #[must_use]
    pub fn parse(full: &str) -> Option<Self> {
        let (db, collection) = full.split_once('.')?;
        if db.is_empty() || collection.is_empty() {
            return None;
        }
        Some(Self::new(db, collection))
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.db, self.collection)
    }
}
