use crate::errors::DbError;
use crate::query::{MAX_PATH_DEPTH, as_f64, parse_filter, parse_sort};
use crate::utils::num::{f64_to_i64_exact, i64_to_usize};
use bson::{Bson, Document as BsonDocument};

use super::types::{
    Accumulator, AccumulatorOp, Expr, GroupStage, Pipeline, ProjectItem, ProjectStage, Stage,
};

const MAX_STAGES: usize = 64;

impl Pipeline {
    /// Parses `[{$stage: spec}, ...]`.
    ///
    /// # Errors
    /// Returns `QueryError` for unknown stages or malformed specs.
    pub fn from_documents(stages: &[BsonDocument]) -> Result<Self, DbError> {
        if stages.len() > MAX_STAGES {
            return Err(DbError::QueryError(format!("pipeline longer than {MAX_STAGES} stages")));
        }
        let stages = stages.iter().map(parse_stage).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { stages })
    }

    /// Parses a JSON array of stage objects.
    ///
    /// # Errors
    /// Returns an error if the text is not a JSON array of objects or a stage is invalid.
    pub fn from_json(json: &str) -> Result<Self, DbError> {
        let val: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Array(items) = val else {
            return Err(DbError::QueryError("pipeline must be a JSON array".into()));
        };
        let docs = items
            .into_iter()
            .map(crate::query::json_value_to_document)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_documents(&docs)
    }
}

fn parse_stage(doc: &BsonDocument) -> Result<Stage, DbError> {
    let mut it = doc.iter();
    let (Some((name, spec)), None) = (it.next(), it.next()) else {
        return Err(DbError::QueryError("each stage must have exactly one key".into()));
    };
    match name.as_str() {
        "$match" => Ok(Stage::Match(parse_filter(as_doc(name, spec)?)?)),
        "$group" => parse_group(as_doc(name, spec)?).map(Stage::Group),
        "$project" => parse_project(as_doc(name, spec)?).map(Stage::Project),
        "$sort" => Ok(Stage::Sort(parse_sort(as_doc(name, spec)?)?)),
        "$skip" => Ok(Stage::Skip(count_operand(name, spec)?)),
        "$limit" => Ok(Stage::Limit(count_operand(name, spec)?)),
        "$count" => match spec {
            Bson::String(s) if !s.is_empty() && !s.starts_with('$') && !s.contains('.') => {
                Ok(Stage::Count(s.clone()))
            }
            _ => Err(DbError::QueryError("$count expects a plain field name".into())),
        },
        other => Err(DbError::QueryError(format!("unsupported pipeline stage {other}"))),
    }
}

fn as_doc<'a>(stage: &str, spec: &'a Bson) -> Result<&'a BsonDocument, DbError> {
    match spec {
        Bson::Document(d) => Ok(d),
        _ => Err(DbError::QueryError(format!("{stage} expects a document"))),
    }
}

fn count_operand(stage: &str, spec: &Bson) -> Result<usize, DbError> {
    as_f64(spec)
        .and_then(f64_to_i64_exact)
        .and_then(i64_to_usize)
        .ok_or_else(|| DbError::QueryError(format!("{stage} expects a non-negative integer")))
}

fn parse_group(spec: &BsonDocument) -> Result<GroupStage, DbError> {
    let id = spec
        .get("_id")
        .ok_or_else(|| DbError::QueryError("$group requires an _id".into()))?;
    let id = parse_expr(id)?;
    let mut accumulators = Vec::new();
    for (output, acc) in spec.iter().filter(|(k, _)| k.as_str() != "_id") {
        if output.contains('.') || output.starts_with('$') {
            return Err(DbError::QueryError(format!("invalid $group output field {output}")));
        }
        let Bson::Document(acc) = acc else {
            return Err(DbError::QueryError(format!("{output} must be an accumulator object")));
        };
        let mut it = acc.iter();
        let (Some((op_name, operand)), None) = (it.next(), it.next()) else {
            return Err(DbError::QueryError(format!("{output} must name one accumulator")));
        };
        let op = AccumulatorOp::from_name(op_name)
            .ok_or_else(|| DbError::QueryError(format!("unknown accumulator {op_name}")))?;
        accumulators.push(Accumulator { output: output.clone(), op, expr: parse_expr(operand)? });
    }
    Ok(GroupStage { id, accumulators })
}

fn parse_project(spec: &BsonDocument) -> Result<ProjectStage, DbError> {
    if spec.is_empty() {
        return Err(DbError::QueryError("$project needs at least one field".into()));
    }
    let mut items = Vec::with_capacity(spec.len());
    for (field, v) in spec {
        let item = match v {
            Bson::Boolean(b) => flag(*b),
            Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => {
                flag(as_f64(v).is_some_and(|f| f != 0.0))
            }
            other => ProjectItem::Computed(parse_expr(other)?),
        };
        items.push((field.clone(), item));
    }
    let includes = items
        .iter()
        .any(|(_, i)| matches!(i, ProjectItem::Include | ProjectItem::Computed(_)));
    let excludes_other =
        items.iter().any(|(k, i)| k != "_id" && matches!(i, ProjectItem::Exclude));
    if includes && excludes_other {
        return Err(DbError::QueryError(
            "$project cannot mix inclusion and exclusion".into(),
        ));
    }
    Ok(ProjectStage { items })
}

fn flag(on: bool) -> ProjectItem {
    if on { ProjectItem::Include } else { ProjectItem::Exclude }
}

/// Parses an aggregation expression.
///
/// # Errors
/// Returns `QueryError` for unknown operators or wrong operand counts.
pub fn parse_expr(v: &Bson) -> Result<Expr, DbError> {
    parse_expr_at(v, 0)
}

fn parse_expr_at(v: &Bson, depth: usize) -> Result<Expr, DbError> {
    if depth > MAX_PATH_DEPTH {
        return Err(DbError::QueryError("expression nested too deeply".into()));
    }
    match v {
        Bson::String(s) if s.starts_with("$$") => {
            Err(DbError::QueryError(format!("variables are not supported: {s}")))
        }
        Bson::String(s) if s.starts_with('$') => {
            let path = &s[1..];
            if path.is_empty() {
                return Err(DbError::QueryError("empty field path".into()));
            }
            Ok(Expr::Field(path.to_string()))
        }
        Bson::Array(items) => items
            .iter()
            .map(|i| parse_expr_at(i, depth + 1))
            .collect::<Result<Vec<_>, _>>()
            .map(Expr::Array),
        Bson::Document(d) => parse_object(d, depth),
        other => Ok(Expr::Literal(other.clone())),
    }
}

fn parse_object(d: &BsonDocument, depth: usize) -> Result<Expr, DbError> {
    let mut it = d.iter();
    if let (Some((op, operand)), None) = (it.next(), it.next())
        && op.starts_with('$')
    {
        return parse_operator(op, operand, depth);
    }
    let mut fields = Vec::with_capacity(d.len());
    for (k, v) in d {
        if k.starts_with('$') {
            return Err(DbError::QueryError(format!("operator {k} must be the only key")));
        }
        fields.push((k.clone(), parse_expr_at(v, depth + 1)?));
    }
    Ok(Expr::Object(fields))
}

fn parse_operator(op: &str, operand: &Bson, depth: usize) -> Result<Expr, DbError> {
    if op == "$literal" {
        return Ok(Expr::Literal(operand.clone()));
    }
    let args: Vec<Expr> = match operand {
        Bson::Array(items) => items
            .iter()
            .map(|i| parse_expr_at(i, depth + 1))
            .collect::<Result<_, _>>()?,
        single => vec![parse_expr_at(single, depth + 1)?],
    };
    let arity = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(DbError::QueryError(format!("{op} takes exactly {n} argument(s)")))
        }
    };
    match op {
        "$floor" => {
            arity(1)?;
            let mut args = args;
            Ok(Expr::Floor(Box::new(args.remove(0))))
        }
        "$divide" | "$subtract" => {
            arity(2)?;
            let mut args = args.into_iter();
            let (Some(a), Some(b)) = (args.next(), args.next()) else {
                return Err(DbError::QueryError(format!("{op} takes exactly 2 arguments")));
            };
            Ok(if op == "$divide" {
                Expr::Divide(Box::new(a), Box::new(b))
            } else {
                Expr::Subtract(Box::new(a), Box::new(b))
            })
        }
        "$multiply" => Ok(Expr::Multiply(args)),
        "$add" => Ok(Expr::Add(args)),
        other => Err(DbError::QueryError(format!("unsupported expression operator {other}"))),
    }
}
