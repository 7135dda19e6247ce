use crate::errors::DbError;
use crate::query::Order;
use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub keys: usize,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub build_time_ms: u64,
}

/// Scalar key component. Numbers share one variant so `1925` and `1925.0` collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKeyKind {
    Null,
    Num(OrderedFloat<f64>),
    Str(String),
    Bool(bool),
}

#[must_use]
pub fn key_from_bson(v: Option<&Bson>) -> Option<IndexKeyKind> {
    match v {
        None | Some(Bson::Null) => Some(IndexKeyKind::Null),
        Some(Bson::String(s)) => Some(IndexKeyKind::Str(s.clone())),
        Some(Bson::Boolean(b)) => Some(IndexKeyKind::Bool(*b)),
        Some(other) => crate::query::as_f64(other).map(|f| IndexKeyKind::Num(OrderedFloat(f))),
    }
}

/// Declaration of an index: ordered key fields with directions and an optional name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexModel {
    pub keys: Vec<(String, Order)>,
    pub name: Option<String>,
}

impl IndexModel {
    /// Builds a model from a key pattern such as `{author: 1, published_year: -1}`.
    ///
    /// # Errors
    /// Returns `IndexError` for an empty pattern or directions other than `1` / `-1`.
    pub fn from_keys(pattern: &BsonDocument) -> Result<Self, DbError> {
        if pattern.is_empty() {
            return Err(DbError::IndexError("index key pattern is empty".into()));
        }
        let mut keys = Vec::with_capacity(pattern.len());
        for (field, dir) in pattern {
            let order = crate::query::direction(dir).ok_or_else(|| {
                DbError::IndexError(format!("index direction for {field} must be 1 or -1"))
            })?;
            keys.push((field.clone(), order));
        }
        Ok(Self { keys, name: None })
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// `title_1`, `author_1_published_year_-1`.
    #[must_use]
    pub fn default_name(&self) -> String {
        self.keys
            .iter()
            .map(|(f, o)| format!("{f}_{}", o.direction()))
            .collect::<Vec<_>>()
            .join("_")
    }

    #[must_use]
    pub fn resolved_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.default_name())
    }

    #[must_use]
    pub fn key_pattern(&self) -> BsonDocument {
        let mut d = BsonDocument::new();
        for (f, o) in &self.keys {
            d.insert(f.clone(), o.direction());
        }
        d
    }

    #[must_use]
    pub fn leading_field(&self) -> &str {
        self.keys.first().map_or("", |(f, _)| f.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct BTreeIndex {
    pub model: IndexModel,
    pub map: BTreeMap<Vec<IndexKeyKind>, BTreeSet<DocumentId>>,
    /// Documents whose key has a non-scalar component. Always returned as candidates.
    pub unkeyed: BTreeSet<DocumentId>,
    pub stats: IndexStats,
}

impl BTreeIndex {
    #[must_use]
    pub fn new(model: IndexModel) -> Self {
        Self {
            model,
            map: BTreeMap::new(),
            unkeyed: BTreeSet::new(),
            stats: IndexStats::default(),
        }
    }

    fn key_of(&self, doc: &BsonDocument) -> Option<Vec<IndexKeyKind>> {
        self.model
            .keys
            .iter()
            .map(|(field, _)| key_from_bson(crate::query::get_path(doc, field)))
            .collect()
    }

    pub fn insert(&mut self, doc: &BsonDocument, id: &DocumentId) {
        match self.key_of(doc) {
            Some(k) => {
                if self.map.entry(k).or_default().insert(id.clone()) {
                    self.stats.entries += 1;
                }
                self.stats.keys = self.map.len();
            }
            None => {
                self.unkeyed.insert(id.clone());
            }
        }
    }

    pub fn remove(&mut self, doc: &BsonDocument, id: &DocumentId) {
        self.unkeyed.remove(id);
        if let Some(k) = self.key_of(doc)
            && let Some(set) = self.map.get_mut(&k)
        {
            if set.remove(id) {
                self.stats.entries = self.stats.entries.saturating_sub(1);
            }
            if set.is_empty() {
                self.map.remove(&k);
            }
            self.stats.keys = self.map.len();
        }
    }

    /// Ids whose leading key equals `v`, plus the number of index keys scanned.
    pub fn lookup_leading_eq(&mut self, v: &Bson) -> Option<(Vec<DocumentId>, u64)> {
        let k = key_from_bson(Some(v))?;
        let mut out = Vec::new();
        let mut scanned = 0u64;
        for (key, ids) in self.map.range(vec![k.clone()]..) {
            if key.first() != Some(&k) {
                break;
            }
            scanned += crate::utils::num::usize_to_u64(ids.len());
            out.extend(ids.iter().cloned());
        }
        out.extend(self.unkeyed.iter().cloned());
        if out.is_empty() {
            self.stats.misses += 1;
        } else {
            self.stats.hits += 1;
        }
        Some((out, scanned))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: String,
    pub key: BsonDocument,
    pub stats: IndexStats,
}

#[derive(Debug, Default)]
pub struct IndexManager {
    pub indexes: BTreeMap<String, BTreeIndex>, // key: index name
}

impl IndexManager {
    #[must_use]
    pub fn new() -> Self {
        Self { indexes: BTreeMap::new() }
    }

    /// Registers an index. Returns `Ok(None)` when an index with the same key pattern
    /// already exists under the resolved name, `Ok(Some(name))` when a new one was added.
    ///
    /// # Errors
    /// Returns `IndexError` when the name is taken by a different key pattern, or the
    /// key pattern is already indexed under another name.
    pub fn create_index(&mut self, model: IndexModel) -> Result<Option<String>, DbError> {
        let name = model.resolved_name();
        if let Some(existing) = self.indexes.get(&name) {
            if existing.model.keys == model.keys {
                return Ok(None);
            }
            return Err(DbError::IndexError(format!(
                "index {name} already exists with a different key pattern"
            )));
        }
        if let Some(other) = self.indexes.values().find(|i| i.model.keys == model.keys) {
            return Err(DbError::IndexError(format!(
                "key pattern already indexed as {}",
                other.model.resolved_name()
            )));
        }
        let model = IndexModel { name: Some(name.clone()), ..model };
        self.indexes.insert(name.clone(), BTreeIndex::new(model));
        Ok(Some(name))
    }

    pub fn drop_index(&mut self, name: &str) -> bool {
        self.indexes.remove(name).is_some()
    }

    #[must_use]
    pub fn descriptors(&self) -> Vec<IndexDescriptor> {
        self.indexes
            .iter()
            .map(|(name, idx)| IndexDescriptor {
                name: name.clone(),
                key: idx.model.key_pattern(),
                stats: idx.stats.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn models(&self) -> Vec<IndexModel> {
        self.indexes.values().map(|i| i.model.clone()).collect()
    }

    /// First index (by name) whose leading field is `field`.
    pub fn leading_on(&mut self, field: &str) -> Option<&mut BTreeIndex> {
        self.indexes.values_mut().find(|i| i.model.leading_field() == field)
    }
}

pub fn index_insert_all(mgr: &mut IndexManager, doc: &BsonDocument, id: &DocumentId) {
    for idx in mgr.indexes.values_mut() {
        idx.insert(doc, id);
    }
}

pub fn index_remove_all(mgr: &mut IndexManager, doc: &BsonDocument, id: &DocumentId) {
    for idx in mgr.indexes.values_mut() {
        idx.remove(doc, id);
    }
}
