//! Aggregation pipelines: `$match`, `$group`, `$project`, `$sort`, `$skip`, `$limit`
//! and `$count`, with arithmetic expressions and group accumulators.
mod exec;
mod parse;
mod types;

pub use exec::aggregate;
pub use parse::parse_expr;
pub use types::{
    Accumulator, AccumulatorOp, Expr, GroupStage, Pipeline, ProjectItem, ProjectStage, Stage,
};
