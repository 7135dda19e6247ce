mod cursor;
mod eval;
mod exec;
mod explain;
mod parse;
mod types;

pub use cursor::Cursor;
pub use eval::{compare_bson, compare_docs, eval_filter, project_fields, values_equal};
pub(crate) use eval::{as_f64, get_path};
pub use exec::{
    ExecStats, apply_update, count_docs, delete_many, delete_one, find_docs, update_many,
    update_one,
};
pub use explain::{ExecutionStats, ExplainReport, WinningPlan, explain_find};
pub(crate) use parse::direction;
pub use parse::{
    json_to_document, json_value_to_document, parse_filter, parse_filter_json, parse_projection,
    parse_sort, parse_update, parse_update_json,
};
pub use types::{
    CmpOp, DeleteReport, Filter, FindOptions, Order, SortSpec, UpdateDoc, UpdateReport,
};
pub(crate) use types::{MAX_LIMIT, MAX_PATH_DEPTH};
