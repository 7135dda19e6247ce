use crate::collection::Collection;
use crate::document::Document;
use crate::errors::DbError;
use crate::types::DocumentId;
use crate::utils::num::{elapsed_ms, usize_to_u64};
use bson::{Bson, Document as BsonDocument};
use std::sync::Arc;

use super::cursor::Cursor;
use super::eval::{compare_docs, eval_filter, project_fields};
use super::types::{
    CmpOp, DeleteReport, Filter, FindOptions, UpdateDoc, UpdateReport,
};

/// Counters gathered while executing a find; surfaced by explain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecStats {
    pub index_name: Option<String>,
    pub key_pattern: Option<BsonDocument>,
    pub keys_examined: u64,
    pub docs_examined: u64,
    pub returned: u64,
    pub duration_ms: u64,
}

struct Candidates {
    ids: Vec<DocumentId>,
    index: Option<(String, BsonDocument)>,
    keys_examined: u64,
}

pub(crate) struct FindOutcome {
    pub ids: Vec<DocumentId>,
    pub docs: Option<Vec<Document>>,
    pub stats: ExecStats,
}

pub(crate) fn run_find(col: &Collection, filter: &Filter, opts: &FindOptions) -> FindOutcome {
    let start = std::time::Instant::now();
    let plan = plan_candidates(col, filter);
    let (index_name, key_pattern) = plan.index.unzip();
    let mut stats = ExecStats {
        index_name,
        key_pattern,
        keys_examined: plan.keys_examined,
        ..ExecStats::default()
    };
    let skip = opts.skip.unwrap_or(0);
    let limit = opts.limit.unwrap_or(usize::MAX);

    if opts.projection.is_none() && opts.sort.is_none() {
        let mut ids = Vec::new();
        for id in plan.ids {
            if let Some(d) = col.find_document(&id) {
                stats.docs_examined += 1;
                if eval_filter(&d.data, filter) {
                    ids.push(id);
                }
            }
        }
        let ids: Vec<DocumentId> = ids.into_iter().skip(skip).take(limit).collect();
        stats.returned = usize_to_u64(ids.len());
        stats.duration_ms = elapsed_ms(start);
        emit_bench(col, "find", &stats, opts);
        return FindOutcome { ids, docs: None, stats };
    }

    let mut docs: Vec<Document> = Vec::new();
    for id in plan.ids {
        if let Some(d) = col.find_document(&id) {
            stats.docs_examined += 1;
            if eval_filter(&d.data, filter) {
                docs.push(d);
            }
        }
    }
    if let Some(sort) = &opts.sort {
        // stable: ties keep natural order
        docs.sort_by(|a, b| compare_docs(&a.data, &b.data, sort));
    }
    let mut docs: Vec<Document> = docs.into_iter().skip(skip).take(limit).collect();
    if let Some(fields) = &opts.projection {
        for d in &mut docs {
            d.data = project_fields(&d.data, fields);
        }
    }
    stats.returned = usize_to_u64(docs.len());
    stats.duration_ms = elapsed_ms(start);
    emit_bench(col, "find", &stats, opts);
    FindOutcome { ids: Vec::new(), docs: Some(docs), stats }
}

fn emit_bench(col: &Collection, op: &str, stats: &ExecStats, opts: &FindOptions) {
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"{op}\",\"collection\":\"{}\",\"duration_ms\":{},\"used_index\":{},\"docs_examined\":{},\"result_count\":{},\"limit\":{},\"skip\":{}}}",
        col.name_str(),
        stats.duration_ms,
        stats.index_name.is_some(),
        stats.docs_examined,
        stats.returned,
        usize_to_u64(opts.limit.unwrap_or(0)),
        usize_to_u64(opts.skip.unwrap_or(0))
    );
}

pub fn find_docs(col: &Arc<Collection>, filter: &Filter, opts: &FindOptions) -> Cursor {
    let out = run_find(col, filter, opts);
    Cursor { collection: col.clone(), ids: out.ids, pos: 0, docs: out.docs }
}

#[must_use]
pub fn count_docs(col: &Collection, filter: &Filter) -> usize {
    matching_ids(col, filter).len()
}

fn matching_ids(col: &Collection, filter: &Filter) -> Vec<DocumentId> {
    plan_candidates(col, filter)
        .ids
        .into_iter()
        .filter(|id| col.find_document(id).is_some_and(|d| eval_filter(&d.data, filter)))
        .collect()
}

fn first_match(col: &Collection, filter: &Filter) -> Option<Document> {
    plan_candidates(col, filter)
        .ids
        .into_iter()
        .filter_map(|id| col.find_document(&id))
        .find(|d| eval_filter(&d.data, filter))
}

/// Applies `update` to every match. Nothing is written unless the update
/// applies cleanly to all of them.
///
/// # Errors
/// Returns `QueryError` when an operator cannot apply to a matched document.
pub fn update_many(
    col: &Collection,
    filter: &Filter,
    update: &UpdateDoc,
) -> Result<UpdateReport, DbError> {
    let start = std::time::Instant::now();
    let mut report = UpdateReport::default();
    let mut staged = Vec::new();
    for id in matching_ids(col, filter) {
        if let Some(mut doc) = col.find_document(&id) {
            report.matched += 1;
            if apply_update(&mut doc, update)? {
                staged.push((id, doc));
            }
        }
    }
    report.modified = usize_to_u64(staged.len());
    for (id, mut doc) in staged {
        doc.metadata.touch();
        col.update_document(&id, doc);
    }
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"update_many\",\"collection\":\"{}\",\"duration_ms\":{},\"matched\":{},\"modified\":{}}}",
        col.name_str(),
        elapsed_ms(start),
        report.matched,
        report.modified
    );
    Ok(report)
}

/// Updates the first match in natural order.
///
/// # Errors
/// Returns `QueryError` when an operator cannot apply to the match.
pub fn update_one(
    col: &Collection,
    filter: &Filter,
    update: &UpdateDoc,
) -> Result<UpdateReport, DbError> {
    let Some(mut doc) = first_match(col, filter) else {
        return Ok(UpdateReport::default());
    };
    let id = doc.id.clone();
    let changed = apply_update(&mut doc, update)?;
    if changed {
        doc.metadata.touch();
        col.update_document(&id, doc);
    }
    Ok(UpdateReport { matched: 1, modified: u64::from(changed) })
}

pub fn delete_many(col: &Collection, filter: &Filter) -> DeleteReport {
    let start = std::time::Instant::now();
    let deleted = matching_ids(col, filter)
        .iter()
        .filter(|id| col.delete_document(id))
        .count();
    let deleted = usize_to_u64(deleted);
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"delete_many\",\"collection\":\"{}\",\"duration_ms\":{},\"deleted\":{}}}",
        col.name_str(),
        elapsed_ms(start),
        deleted
    );
    DeleteReport { deleted }
}

/// Deletes the first match in natural order.
pub fn delete_one(col: &Collection, filter: &Filter) -> DeleteReport {
    match first_match(col, filter) {
        Some(doc) => DeleteReport { deleted: u64::from(col.delete_document(&doc.id)) },
        None => DeleteReport::default(),
    }
}

/// Applies `$set`, `$inc` and `$unset`. Returns whether the payload changed.
///
/// Missing parents are created by `$set` and `$inc`. A path running through a
/// scalar, or `$inc` on a non-numeric value, fails and leaves `doc` untouched.
///
/// # Errors
/// Returns `QueryError` naming the offending path.
pub fn apply_update(doc: &mut Document, upd: &UpdateDoc) -> Result<bool, DbError> {
    let mut data = doc.data.clone();
    let mut changed = false;
    for (k, v) in &upd.set {
        changed |= set_path(&mut data, k, v.clone())?;
    }
    for (k, by) in &upd.inc {
        changed |= inc_path(&mut data, k, *by)?;
    }
    for k in &upd.unset {
        changed |= unset_path(&mut data, k);
    }
    if changed {
        doc.data = data;
    }
    Ok(changed)
}

fn blocked(path: &str, seg: &str, found: &Bson) -> DbError {
    DbError::QueryError(format!(
        "cannot apply update to {path}: {seg} holds {:?}, not a document",
        found.element_type()
    ))
}

fn parent_for_write<'a>(
    root: &'a mut BsonDocument,
    path: &str,
) -> Result<(&'a mut BsonDocument, String), DbError> {
    let mut segs: Vec<&str> = path.split('.').collect();
    let last = segs.pop().unwrap_or_default().to_string();
    let mut cur = root;
    for seg in segs {
        if !cur.contains_key(seg) {
            cur.insert(seg.to_string(), BsonDocument::new());
        }
        cur = match cur.get_mut(seg) {
            Some(Bson::Document(d)) => d,
            Some(other) => return Err(blocked(path, seg, other)),
            None => return Err(DbError::QueryError(format!("cannot resolve {path}"))),
        };
    }
    Ok((cur, last))
}

fn set_path(root: &mut BsonDocument, path: &str, value: Bson) -> Result<bool, DbError> {
    let (parent, last) = parent_for_write(root, path)?;
    let old = parent.insert(last, value.clone());
    Ok(old.as_ref() != Some(&value))
}

// Unsetting below a missing or scalar parent is a no-op.
fn unset_path(root: &mut BsonDocument, path: &str) -> bool {
    let mut segs: Vec<&str> = path.split('.').collect();
    let last = segs.pop().unwrap_or_default();
    let mut cur = root;
    for seg in segs {
        match cur.get_mut(seg) {
            Some(Bson::Document(d)) => cur = d,
            _ => return false,
        }
    }
    cur.remove(last).is_some()
}

fn inc_path(root: &mut BsonDocument, path: &str, by: f64) -> Result<bool, DbError> {
    let int_by = crate::utils::num::f64_to_i64_exact(by);
    let next = match (super::eval::get_path(root, path), int_by) {
        (None, Some(b)) => narrow(b),
        (None, None) => Bson::Double(by),
        (Some(Bson::Int32(i)), Some(b)) => narrow(i64::from(*i).saturating_add(b)),
        (Some(Bson::Int64(i)), Some(b)) => Bson::Int64(i.saturating_add(b)),
        (Some(cur), _) => match super::eval::as_f64(cur) {
            Some(f) => Bson::Double(f + by),
            None => {
                return Err(DbError::QueryError(format!(
                    "cannot apply $inc to {path}: {:?} is not numeric",
                    cur.element_type()
                )));
            }
        },
    };
    set_path(root, path, next)
}

fn narrow(v: i64) -> Bson {
    i32::try_from(v).map_or(Bson::Int64(v), Bson::Int32)
}

fn plan_candidates(col: &Collection, filter: &Filter) -> Candidates {
    match index_lookup(col, filter) {
        Some((name, pattern, ids, scanned)) => Candidates {
            ids: col.in_natural_order(&ids),
            index: Some((name, pattern)),
            keys_examined: scanned,
        },
        None => Candidates { ids: col.list_ids(), index: None, keys_examined: 0 },
    }
}

fn index_lookup(
    col: &Collection,
    filter: &Filter,
) -> Option<(String, BsonDocument, Vec<DocumentId>, u64)> {
    match filter {
        Filter::Cmp { path, op: CmpOp::Eq, value } => {
            let mut mgr = col.indexes.write();
            let idx = mgr.leading_on(path)?;
            let (ids, scanned) = idx.lookup_leading_eq(value)?;
            Some((idx.model.resolved_name(), idx.model.key_pattern(), ids, scanned))
        }
        Filter::And(fs) => fs.iter().find_map(|f| index_lookup(col, f)),
        _ => None,
    }
}
