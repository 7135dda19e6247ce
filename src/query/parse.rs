use crate::errors::DbError;
use bson::{Bson, Document as BsonDocument};

use super::types::{
    CmpOp, Filter, MAX_IN_SET, MAX_PATH_DEPTH, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS,
    MAX_UPDATE_FIELDS, Order, SortSpec, UpdateDoc, check_len,
};

/// Parses a Mongo-shaped filter document.
///
/// `{field: value}` is equality, `{field: {$op: value}}` applies operators, and
/// `$and` / `$or` / `$nor` take arrays of filter documents. Sibling fields are ANDed.
///
/// # Errors
/// Returns `QueryError` on unknown operators or malformed operands.
pub fn parse_filter(doc: &BsonDocument) -> Result<Filter, DbError> {
    parse_filter_at(doc, 0)
}

fn parse_filter_at(doc: &BsonDocument, depth: usize) -> Result<Filter, DbError> {
    if depth > MAX_PATH_DEPTH {
        return Err(DbError::QueryError("filter nested too deeply".into()));
    }
    let mut parts = Vec::with_capacity(doc.len());
    for (key, value) in doc {
        match key.as_str() {
            "$and" => parts.push(Filter::And(parse_clauses(key, value, depth)?)),
            "$or" => parts.push(Filter::Or(parse_clauses(key, value, depth)?)),
            "$nor" => parts.push(Filter::Not(Box::new(Filter::Or(parse_clauses(key, value, depth)?)))),
            k if k.starts_with('$') => {
                return Err(DbError::QueryError(format!("unknown top-level operator {k}")));
            }
            field => parts.push(parse_field(field, value, depth)?),
        }
    }
    Ok(Filter::all(parts))
}

fn parse_clauses(op: &str, value: &Bson, depth: usize) -> Result<Vec<Filter>, DbError> {
    let Bson::Array(items) = value else {
        return Err(DbError::QueryError(format!("{op} expects an array")));
    };
    if items.is_empty() {
        return Err(DbError::QueryError(format!("{op} expects a non-empty array")));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => parse_filter_at(d, depth + 1),
            _ => Err(DbError::QueryError(format!("{op} entries must be documents"))),
        })
        .collect()
}

fn is_operator_doc(d: &BsonDocument) -> bool {
    !d.is_empty() && d.keys().all(|k| k.starts_with('$'))
}

fn parse_field(field: &str, value: &Bson, depth: usize) -> Result<Filter, DbError> {
    match value {
        Bson::Document(ops) if is_operator_doc(ops) => parse_operators(field, ops, depth),
        other => Ok(Filter::cmp(field, CmpOp::Eq, other.clone())),
    }
}

fn parse_operators(field: &str, ops: &BsonDocument, depth: usize) -> Result<Filter, DbError> {
    let mut parts = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        let f = match op.as_str() {
            "$eq" => Filter::cmp(field, CmpOp::Eq, operand.clone()),
            "$ne" => Filter::cmp(field, CmpOp::Ne, operand.clone()),
            "$gt" => Filter::cmp(field, CmpOp::Gt, operand.clone()),
            "$gte" => Filter::cmp(field, CmpOp::Gte, operand.clone()),
            "$lt" => Filter::cmp(field, CmpOp::Lt, operand.clone()),
            "$lte" => Filter::cmp(field, CmpOp::Lte, operand.clone()),
            "$in" => Filter::In { path: field.to_string(), values: value_set(op, operand)? },
            "$nin" => Filter::Nin { path: field.to_string(), values: value_set(op, operand)? },
            "$exists" => Filter::Exists { path: field.to_string(), exists: truthy(operand) },
            "$not" => match operand {
                Bson::Document(inner) if is_operator_doc(inner) => {
                    if depth >= MAX_PATH_DEPTH {
                        return Err(DbError::QueryError("filter nested too deeply".into()));
                    }
                    Filter::Not(Box::new(parse_operators(field, inner, depth + 1)?))
                }
                _ => return Err(DbError::QueryError("$not expects an operator document".into())),
            },
            other => return Err(DbError::QueryError(format!("unknown operator {other}"))),
        };
        parts.push(f);
    }
    Ok(Filter::all(parts))
}

fn value_set(op: &str, operand: &Bson) -> Result<Vec<Bson>, DbError> {
    match operand {
        Bson::Array(vals) => {
            check_len(&format!("{op} values"), vals.len(), MAX_IN_SET)?;
            Ok(vals.clone())
        }
        _ => Err(DbError::QueryError(format!("{op} expects an array"))),
    }
}

fn truthy(v: &Bson) -> bool {
    match v {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(f) => *f != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

/// Parses `{$set: {...}, $inc: {...}, $unset: {...}}`.
///
/// # Errors
/// Returns `QueryError` for unknown operators, non-numeric `$inc` or an empty update.
pub fn parse_update(doc: &BsonDocument) -> Result<UpdateDoc, DbError> {
    let mut out = UpdateDoc::default();
    for (op, operand) in doc {
        let Bson::Document(fields) = operand else {
            return Err(DbError::QueryError(format!("{op} expects a document")));
        };
        check_len(&format!("{op} fields"), fields.len(), MAX_UPDATE_FIELDS)?;
        match op.as_str() {
            "$set" => {
                for (k, v) in fields {
                    out.set.push((k.clone(), v.clone()));
                }
            }
            "$inc" => {
                for (k, v) in fields {
                    let by = super::eval::as_f64(v)
                        .ok_or_else(|| DbError::QueryError("$inc requires numeric".into()))?;
                    out.inc.push((k.clone(), by));
                }
            }
            "$unset" => {
                out.unset.extend(fields.keys().cloned());
            }
            other => return Err(DbError::QueryError(format!("unknown update operator {other}"))),
        }
    }
    if out.is_empty() {
        return Err(DbError::QueryError("update document is empty".into()));
    }
    Ok(out)
}

/// Parses `{field: 1, other: -1}` into sort keys.
///
/// # Errors
/// Returns `QueryError` when a direction is not `1` or `-1`, or for too many keys.
pub fn parse_sort(doc: &BsonDocument) -> Result<Vec<SortSpec>, DbError> {
    check_len("sort keys", doc.len(), MAX_SORT_FIELDS)?;
    doc.iter()
        .map(|(field, dir)| {
            let order = direction(dir).ok_or_else(|| {
                DbError::QueryError(format!("sort direction for {field} must be 1 or -1"))
            })?;
            Ok(SortSpec { field: field.clone(), order })
        })
        .collect()
}

pub(crate) fn direction(v: &Bson) -> Option<Order> {
    match v {
        Bson::Int32(i) => Order::from_direction(i64::from(*i)),
        Bson::Int64(i) => Order::from_direction(*i),
        Bson::Double(f) => crate::utils::num::f64_to_i64_exact(*f).and_then(Order::from_direction),
        _ => None,
    }
}

/// Parses an inclusion projection `{field: 1, ...}` into a field list.
///
/// # Errors
/// Returns `QueryError` for exclusions other than `_id`, or for too many fields.
pub fn parse_projection(doc: &BsonDocument) -> Result<Vec<String>, DbError> {
    check_len("projection fields", doc.len(), MAX_PROJECTION_FIELDS)?;
    let mut fields = Vec::new();
    for (field, flag) in doc {
        if truthy(flag) {
            fields.push(field.clone());
        } else if field != "_id" {
            return Err(DbError::QueryError(format!(
                "find projection only supports inclusion, got {field}: 0"
            )));
        }
    }
    Ok(fields)
}

/// Converts a JSON object string into a bson document.
///
/// # Errors
/// Returns an error if the text is not JSON or not an object.
pub fn json_to_document(json: &str) -> Result<BsonDocument, DbError> {
    let val: serde_json::Value = serde_json::from_str(json)?;
    json_value_to_document(val)
}

/// # Errors
/// Returns `Bson` when the value is not a JSON object or cannot be represented.
pub fn json_value_to_document(val: serde_json::Value) -> Result<BsonDocument, DbError> {
    match val {
        serde_json::Value::Object(map) => {
            BsonDocument::try_from(map).map_err(|e| DbError::Bson(e.to_string()))
        }
        _ => Err(DbError::Bson("expected JSON object".into())),
    }
}

/// # Errors
/// Returns an error if the JSON string cannot be parsed into a filter.
pub fn parse_filter_json(json: &str) -> Result<Filter, DbError> {
    parse_filter(&json_to_document(json)?)
}

/// # Errors
/// Returns an error if the JSON string cannot be parsed into an update.
pub fn parse_update_json(json: &str) -> Result<UpdateDoc, DbError> {
    parse_update(&json_to_document(json)?)
}
