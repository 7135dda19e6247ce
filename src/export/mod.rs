mod options;
mod sinks;

pub use options::{ExportOptions, ExportReport};
pub use sinks::{DocSink, NdjsonSink};

use crate::collection::Collection;
use crate::errors::DbError;
use crate::query::{self, FindOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Writes the collection to `path` as NDJSON, replacing it atomically through a
/// temp file in the same directory.
///
/// # Errors
/// Returns an error if the destination cannot be created or the write/persist fails.
pub fn export_file(
    collection: &Arc<Collection>,
    path: impl AsRef<Path>,
    opts: &ExportOptions,
) -> Result<ExportReport, DbError> {
    let dest = path.as_ref();
    log::info!("export: collection={}, path={}", collection.namespace(), dest.display());
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = tempfile::Builder::new().suffix(&opts.temp_suffix).tempfile_in(parent)?;
    let report = export_to_writer(collection, &mut tmp, opts)?;
    persist(tmp, dest)?;
    Ok(report)
}

fn persist(tmp: NamedTempFile, dest: &Path) -> Result<(), DbError> {
    tmp.persist(dest).map_err(|pe| DbError::Io(format!("{}: {}", dest.display(), pe.error)))?;
    Ok(())
}

/// Writes matching documents, in natural order, to `writer`.
///
/// # Errors
/// Returns an error if writing fails.
pub fn export_to_writer<W: Write>(
    collection: &Arc<Collection>,
    writer: W,
    opts: &ExportOptions,
) -> Result<ExportReport, DbError> {
    let mut sink = NdjsonSink::new(writer);
    let mut report = ExportReport::default();
    let docs = match &opts.filter {
        Some(f) => {
            let find = FindOptions { limit: opts.limit, ..FindOptions::default() };
            query::find_docs(collection, f, &find).into_documents()
        }
        None => {
            let all = collection.get_all_documents().into_iter().map(|d| d.data);
            all.take(opts.limit.unwrap_or(usize::MAX)).collect()
        }
    };
    for doc in &docs {
        sink.write_doc(doc)?;
        report.written += 1;
    }
    Box::new(sink).finish()?;
    Ok(report)
}
