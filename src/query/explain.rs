use crate::collection::Collection;
use bson::{Document as BsonDocument, doc};

use super::exec::{ExecStats, run_find};
use super::types::{Filter, FindOptions};

#[derive(Debug, Clone, PartialEq)]
pub enum WinningPlan {
    IndexScan { index_name: String, key_pattern: BsonDocument },
    CollectionScan,
}

impl WinningPlan {
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            WinningPlan::IndexScan { .. } => "IXSCAN",
            WinningPlan::CollectionScan => "COLLSCAN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionStats {
    pub execution_success: bool,
    pub n_returned: u64,
    pub execution_time_millis: u64,
    pub total_keys_examined: u64,
    pub total_docs_examined: u64,
}

/// Plan and counters for one executed find. Matched documents are not kept.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainReport {
    pub namespace: String,
    pub winning_plan: WinningPlan,
    pub execution_stats: ExecutionStats,
}

impl ExplainReport {
    fn from_stats(namespace: String, stats: ExecStats) -> Self {
        let winning_plan = match (stats.index_name, stats.key_pattern) {
            (Some(index_name), Some(key_pattern)) => {
                WinningPlan::IndexScan { index_name, key_pattern }
            }
            _ => WinningPlan::CollectionScan,
        };
        Self {
            namespace,
            winning_plan,
            execution_stats: ExecutionStats {
                execution_success: true,
                n_returned: stats.returned,
                execution_time_millis: stats.duration_ms,
                total_keys_examined: stats.keys_examined,
                total_docs_examined: stats.docs_examined,
            },
        }
    }

    #[must_use]
    pub fn execution_stats_document(&self) -> BsonDocument {
        let s = &self.execution_stats;
        doc! {
            "executionSuccess": s.execution_success,
            "nReturned": to_i64(s.n_returned),
            "executionTimeMillis": to_i64(s.execution_time_millis),
            "totalKeysExamined": to_i64(s.total_keys_examined),
            "totalDocsExamined": to_i64(s.total_docs_examined),
        }
    }

    #[must_use]
    pub fn to_document(&self) -> BsonDocument {
        let mut plan = doc! { "stage": self.winning_plan.stage() };
        if let WinningPlan::IndexScan { index_name, key_pattern } = &self.winning_plan {
            plan.insert("indexName", index_name.clone());
            plan.insert("keyPattern", key_pattern.clone());
        }
        doc! {
            "queryPlanner": { "namespace": self.namespace.clone(), "winningPlan": plan },
            "executionStats": self.execution_stats_document(),
        }
    }
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

pub fn explain_find(col: &Collection, filter: &Filter, opts: &FindOptions) -> ExplainReport {
    let out = run_find(col, filter, opts);
    log::debug!(
        "explain {}: index={:?} docs_examined={}",
        col.namespace(),
        out.stats.index_name,
        out.stats.docs_examined
    );
    ExplainReport::from_stats(col.namespace().to_string(), out.stats)
}
