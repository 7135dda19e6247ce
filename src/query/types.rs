use crate::errors::DbError;
use bson::Bson;
use serde::{Deserialize, Serialize};

// Inputs past these limits are rejected, never truncated.
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;
pub(crate) const MAX_LIMIT: usize = 10_000;
pub(crate) const MAX_UPDATE_FIELDS: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    /// Maps a Mongo-style direction (`1` / `-1`) to an order.
    #[must_use]
    pub const fn from_direction(dir: i64) -> Option<Self> {
        match dir {
            1 => Some(Self::Asc),
            -1 => Some(Self::Desc),
            _ => None,
        }
    }

    #[must_use]
    pub const fn direction(self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    #[must_use]
    pub fn asc(field: &str) -> Self {
        Self { field: field.to_string(), order: Order::Asc }
    }

    #[must_use]
    pub fn desc(field: &str) -> Self {
        Self { field: field.to_string(), order: Order::Desc }
    }
}

/// Options for `find_docs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindOptions {
    pub projection: Option<Vec<String>>,
    pub sort: Option<Vec<SortSpec>>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

impl FindOptions {
    /// An absent limit returns every match.
    ///
    /// # Errors
    /// Returns `QueryError` when the limit, sort keys or projection exceed their caps.
    pub fn validate(&self) -> Result<(), DbError> {
        if let Some(limit) = self.limit
            && limit > MAX_LIMIT
        {
            return Err(DbError::QueryError(format!("limit {limit} exceeds {MAX_LIMIT}")));
        }
        if let Some(sort) = &self.sort {
            check_len("sort keys", sort.len(), MAX_SORT_FIELDS)?;
        }
        if let Some(fields) = &self.projection {
            check_len("projection fields", fields.len(), MAX_PROJECTION_FIELDS)?;
        }
        Ok(())
    }
}

pub(crate) fn check_len(what: &str, len: usize, max: usize) -> Result<(), DbError> {
    if len > max {
        return Err(DbError::QueryError(format!("{len} {what} exceeds the limit of {max}")));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
}

impl Filter {
    pub fn cmp(path: &str, op: CmpOp, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.to_string(), op, value: value.into() }
    }

    pub fn eq(path: &str, value: impl Into<Bson>) -> Self {
        Self::cmp(path, CmpOp::Eq, value)
    }

    pub fn gt(path: &str, value: impl Into<Bson>) -> Self {
        Self::cmp(path, CmpOp::Gt, value)
    }

    /// Flattens a conjunction of one into its only member.
    #[must_use]
    pub fn all(mut filters: Vec<Self>) -> Self {
        match filters.len() {
            0 => Self::True,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpdateDoc {
    pub set: Vec<(String, Bson)>,
    pub inc: Vec<(String, f64)>,
    pub unset: Vec<String>,
}

impl UpdateDoc {
    pub fn set(field: &str, value: impl Into<Bson>) -> Self {
        Self { set: vec![(field.to_string(), value.into())], ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty() && self.unset.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: u64,
}
