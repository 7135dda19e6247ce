use crate::query::Filter;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub temp_suffix: String,
    pub filter: Option<Filter>,
    pub limit: Option<usize>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { temp_suffix: ".tmp".to_string(), filter: None, limit: None }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub written: u64,
}
