use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// Sniff the first non-blank byte: `[` means a JSON array.
    Auto,
    Ndjson,
    JsonArray,
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub format: ImportFormat,
    pub skip_errors: bool,
    /// Rejected lines are appended here as JSON records when `skip_errors` is set.
    pub error_sidecar: Option<PathBuf>,
    pub progress_every: Option<usize>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { format: ImportFormat::Auto, skip_errors: false, error_sidecar: None, progress_every: None }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: u64,
    pub skipped: u64,
}
