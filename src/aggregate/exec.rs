use crate::collection::Collection;
use crate::errors::DbError;
use crate::query::{
    FindOptions, compare_bson, compare_docs, eval_filter, find_docs, get_path, values_equal,
};
use crate::utils::num::elapsed_ms;
use bson::{Bson, Document as BsonDocument};
use std::collections::HashMap;
use std::sync::Arc;

use super::types::{
    Accumulator, AccumulatorOp, Expr, GroupStage, Pipeline, ProjectItem, ProjectStage, Stage,
};

/// Runs `pipeline` over the collection in natural order. A leading `$match` is
/// answered through `find`, so it can use an index.
///
/// # Errors
/// Propagates expression errors such as division by zero.
pub fn aggregate(
    col: &Arc<Collection>,
    pipeline: &Pipeline,
) -> Result<Vec<BsonDocument>, DbError> {
    let start = std::time::Instant::now();
    let (input, rest) = match pipeline.stages.split_first() {
        Some((Stage::Match(filter), rest)) => {
            (find_docs(col, filter, &FindOptions::default()).into_documents(), rest)
        }
        _ => (
            col.get_all_documents().into_iter().map(|d| d.data).collect(),
            &pipeline.stages[..],
        ),
    };
    let out = run_stages(rest, input)?;
    crate::devlog!(
        "{{\"bench\":\"aggregate\",\"collection\":\"{}\",\"stages\":{},\"duration_ms\":{},\"result_count\":{}}}",
        col.name_str(),
        pipeline.stages.len(),
        elapsed_ms(start),
        out.len()
    );
    Ok(out)
}

impl Pipeline {
    /// Runs the pipeline over already-materialized documents.
    ///
    /// # Errors
    /// Propagates expression errors such as division by zero.
    pub fn execute(&self, docs: Vec<BsonDocument>) -> Result<Vec<BsonDocument>, DbError> {
        run_stages(&self.stages, docs)
    }
}

fn run_stages(
    stages: &[Stage],
    mut docs: Vec<BsonDocument>,
) -> Result<Vec<BsonDocument>, DbError> {
    for stage in stages {
        let before = docs.len();
        docs = match stage {
            Stage::Match(f) => docs.into_iter().filter(|d| eval_filter(d, f)).collect(),
            Stage::Group(g) => group(g, &docs)?,
            Stage::Project(p) => docs.iter().map(|d| project(p, d)).collect::<Result<_, _>>()?,
            Stage::Sort(spec) => {
                docs.sort_by(|a, b| compare_docs(a, b, spec));
                docs
            }
            Stage::Skip(n) => docs.into_iter().skip(*n).collect(),
            Stage::Limit(n) => docs.into_iter().take(*n).collect(),
            Stage::Count(field) => {
                if docs.is_empty() {
                    Vec::new()
                } else {
                    let mut out = BsonDocument::new();
                    let n = i64::try_from(docs.len()).unwrap_or(i64::MAX);
                    out.insert(field.clone(), narrow(n));
                    vec![out]
                }
            }
        };
        log::trace!("{} {} -> {} documents", stage.name(), before, docs.len());
    }
    Ok(docs)
}

fn group(stage: &GroupStage, docs: &[BsonDocument]) -> Result<Vec<BsonDocument>, DbError> {
    let mut buckets: Vec<(Bson, Vec<AccState>)> = Vec::new();
    let mut slot_of: HashMap<String, Vec<usize>> = HashMap::new();
    for doc in docs {
        let key = eval(&stage.id, doc)?;
        let slots = slot_of.entry(bucket_hash(&key)).or_default();
        let idx = match slots.iter().copied().find(|&i| group_keys_equal(&buckets[i].0, &key)) {
            Some(i) => i,
            None => {
                buckets.push((key, stage.accumulators.iter().map(AccState::new).collect()));
                slots.push(buckets.len() - 1);
                buckets.len() - 1
            }
        };
        for (state, acc) in buckets[idx].1.iter_mut().zip(&stage.accumulators) {
            state.feed(eval(&acc.expr, doc)?);
        }
    }
    Ok(buckets
        .into_iter()
        .map(|(key, states)| {
            let mut out = BsonDocument::new();
            out.insert("_id", key);
            for (state, acc) in states.into_iter().zip(&stage.accumulators) {
                out.insert(acc.output.clone(), state.finish());
            }
            out
        })
        .collect())
}

/// Numbers of any width land in the same bucket when equal by value; `-0.0`
/// shares the bucket of `0`.
fn bucket_hash(key: &Bson) -> String {
    match crate::query::as_f64(key) {
        Some(f) if f == 0.0 => "#0".to_string(),
        Some(f) => format!("#{f}"),
        None => key.to_string(),
    }
}

fn group_keys_equal(a: &Bson, b: &Bson) -> bool {
    values_equal(a, b)
}

fn project(stage: &ProjectStage, doc: &BsonDocument) -> Result<BsonDocument, DbError> {
    if stage.is_exclusion() {
        let mut out = doc.clone();
        for (field, _) in &stage.items {
            out.remove(field);
        }
        return Ok(out);
    }
    let mut out = BsonDocument::new();
    let id_listed = stage.items.iter().any(|(k, _)| k == "_id");
    if !id_listed && let Some(id) = doc.get("_id") {
        out.insert("_id", id.clone());
    }
    for (field, item) in &stage.items {
        match item {
            ProjectItem::Include => {
                if let Some(v) = get_path(doc, field) {
                    out.insert(field.clone(), v.clone());
                }
            }
            ProjectItem::Exclude => {}
            ProjectItem::Computed(Expr::Field(path)) => {
                if let Some(v) = get_path(doc, path) {
                    out.insert(field.clone(), v.clone());
                }
            }
            ProjectItem::Computed(expr) => {
                out.insert(field.clone(), eval(expr, doc)?);
            }
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(v: &Bson) -> Option<Num> {
        match v {
            Bson::Int32(i) => Some(Num::Int(i64::from(*i))),
            Bson::Int64(i) => Some(Num::Int(*i)),
            Bson::Double(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    fn f64(self) -> f64 {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn add(self, other: Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => {
                a.checked_add(b).map_or(Num::Float(self.f64() + other.f64()), Num::Int)
            }
            _ => Num::Float(self.f64() + other.f64()),
        }
    }

    fn mul(self, other: Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => {
                a.checked_mul(b).map_or(Num::Float(self.f64() * other.f64()), Num::Int)
            }
            _ => Num::Float(self.f64() * other.f64()),
        }
    }

    fn into_bson(self) -> Bson {
        match self {
            Num::Int(i) => narrow(i),
            Num::Float(f) => Bson::Double(f),
        }
    }
}

fn narrow(v: i64) -> Bson {
    i32::try_from(v).map_or(Bson::Int64(v), Bson::Int32)
}

/// `None` for null or missing operands; an error for anything else non-numeric.
fn operand(op: &str, v: &Bson) -> Result<Option<Num>, DbError> {
    match v {
        Bson::Null | Bson::Undefined => Ok(None),
        other => Num::of(other)
            .map(Some)
            .ok_or_else(|| DbError::QueryError(format!("{op} only supports numeric types"))),
    }
}

fn eval(expr: &Expr, doc: &BsonDocument) -> Result<Bson, DbError> {
    Ok(match expr {
        Expr::Literal(v) => v.clone(),
        Expr::Field(path) => get_path(doc, path).cloned().unwrap_or(Bson::Null),
        Expr::Object(fields) => {
            let mut out = BsonDocument::new();
            for (k, e) in fields {
                out.insert(k.clone(), eval(e, doc)?);
            }
            Bson::Document(out)
        }
        Expr::Array(items) => {
            Bson::Array(items.iter().map(|e| eval(e, doc)).collect::<Result<_, _>>()?)
        }
        Expr::Floor(e) => match operand("$floor", &eval(e, doc)?)? {
            None => Bson::Null,
            Some(Num::Int(i)) => narrow(i),
            Some(Num::Float(f)) => Bson::Double(f.floor()),
        },
        Expr::Divide(a, b) => {
            let (a, b) = (eval(a, doc)?, eval(b, doc)?);
            match (operand("$divide", &a)?, operand("$divide", &b)?) {
                (Some(_), Some(d)) if d.f64() == 0.0 => {
                    return Err(DbError::QueryError("can't $divide by zero".into()));
                }
                (Some(n), Some(d)) => Bson::Double(n.f64() / d.f64()),
                _ => Bson::Null,
            }
        }
        Expr::Subtract(a, b) => {
            let (a, b) = (eval(a, doc)?, eval(b, doc)?);
            match (operand("$subtract", &a)?, operand("$subtract", &b)?) {
                (Some(Num::Int(x)), Some(Num::Int(y))) => {
                    x.checked_sub(y).map_or(Bson::Double(f64_sub(x, y)), narrow)
                }
                (Some(x), Some(y)) => Bson::Double(x.f64() - y.f64()),
                _ => Bson::Null,
            }
        }
        Expr::Add(items) => fold_numeric("$add", items, doc, Num::Int(0), Num::add)?,
        Expr::Multiply(items) => fold_numeric("$multiply", items, doc, Num::Int(1), Num::mul)?,
    })
}

#[allow(clippy::cast_precision_loss)]
fn f64_sub(x: i64, y: i64) -> f64 {
    x as f64 - y as f64
}

fn fold_numeric(
    op: &str,
    items: &[Expr],
    doc: &BsonDocument,
    init: Num,
    f: fn(Num, Num) -> Num,
) -> Result<Bson, DbError> {
    let mut acc = init;
    let mut saw_null = false;
    for e in items {
        match operand(op, &eval(e, doc)?)? {
            Some(n) => acc = f(acc, n),
            None => saw_null = true,
        }
    }
    Ok(if saw_null { Bson::Null } else { acc.into_bson() })
}

enum AccState {
    Sum(Num),
    Avg { total: f64, count: u64 },
    Min(Option<Bson>),
    Max(Option<Bson>),
    First(Option<Bson>),
    Last(Option<Bson>),
}

impl AccState {
    fn new(acc: &Accumulator) -> Self {
        match acc.op {
            AccumulatorOp::Sum => AccState::Sum(Num::Int(0)),
            AccumulatorOp::Avg => AccState::Avg { total: 0.0, count: 0 },
            AccumulatorOp::Min => AccState::Min(None),
            AccumulatorOp::Max => AccState::Max(None),
            AccumulatorOp::First => AccState::First(None),
            AccumulatorOp::Last => AccState::Last(None),
        }
    }

    fn feed(&mut self, v: Bson) {
        match self {
            AccState::Sum(total) => {
                if let Some(n) = Num::of(&v) {
                    *total = total.add(n);
                }
            }
            AccState::Avg { total, count } => {
                if let Some(n) = Num::of(&v) {
                    *total += n.f64();
                    *count += 1;
                }
            }
            AccState::Min(cur) => {
                if !matches!(v, Bson::Null | Bson::Undefined)
                    && cur.as_ref().is_none_or(|c| compare_bson(&v, c).is_lt())
                {
                    *cur = Some(v);
                }
            }
            AccState::Max(cur) => {
                if !matches!(v, Bson::Null | Bson::Undefined)
                    && cur.as_ref().is_none_or(|c| compare_bson(&v, c).is_gt())
                {
                    *cur = Some(v);
                }
            }
            AccState::First(cur) => {
                if cur.is_none() {
                    *cur = Some(v);
                }
            }
            AccState::Last(cur) => *cur = Some(v),
        }
    }

    fn finish(self) -> Bson {
        match self {
            AccState::Sum(total) => total.into_bson(),
            AccState::Avg { count: 0, .. } => Bson::Null,
            #[allow(clippy::cast_precision_loss)]
            AccState::Avg { total, count } => Bson::Double(total / count as f64),
            AccState::Min(v) | AccState::Max(v) | AccState::First(v) | AccState::Last(v) => {
                v.unwrap_or(Bson::Null)
            }
        }
    }
}
