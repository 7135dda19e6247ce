use crate::query::{Filter, SortSpec};
use bson::Bson;

/// Aggregation expression evaluated against one input document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Bson),
    /// `"$a.b"`, stored without the leading `$`.
    Field(String),
    Object(Vec<(String, Expr)>),
    Array(Vec<Expr>),
    Floor(Box<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    Multiply(Vec<Expr>),
    Add(Vec<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn field(path: &str) -> Self {
        Expr::Field(path.to_string())
    }

    pub fn literal(v: impl Into<Bson>) -> Self {
        Expr::Literal(v.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorOp {
    Sum,
    Avg,
    Min,
    Max,
    First,
    Last,
}

impl AccumulatorOp {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "$sum" => Self::Sum,
            "$avg" => Self::Avg,
            "$min" => Self::Min,
            "$max" => Self::Max,
            "$first" => Self::First,
            "$last" => Self::Last,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    pub output: String,
    pub op: AccumulatorOp,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupStage {
    pub id: Expr,
    pub accumulators: Vec<Accumulator>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectItem {
    Include,
    Exclude,
    Computed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectStage {
    pub items: Vec<(String, ProjectItem)>,
}

impl ProjectStage {
    /// Exclusion mode: every item (including `_id`) is an `Exclude`.
    #[must_use]
    pub fn is_exclusion(&self) -> bool {
        self.items.iter().all(|(_, item)| matches!(item, ProjectItem::Exclude))
    }

    #[must_use]
    pub fn excludes_id(&self) -> bool {
        self.items.iter().any(|(k, item)| k == "_id" && matches!(item, ProjectItem::Exclude))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Group(GroupStage),
    Project(ProjectStage),
    Sort(Vec<SortSpec>),
    Skip(usize),
    Limit(usize),
    Count(String),
}

impl Stage {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Group(_) => "$group",
            Stage::Project(_) => "$project",
            Stage::Sort(_) => "$sort",
            Stage::Skip(_) => "$skip",
            Stage::Limit(_) => "$limit",
            Stage::Count(_) => "$count",
        }
    }
}

/// Ordered list of stages; each consumes the previous stage's output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}
