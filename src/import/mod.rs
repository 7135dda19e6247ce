mod ndjson;
mod options;

pub use ndjson::import_from_reader;
pub use options::{ImportFormat, ImportOptions, ImportReport};

use crate::collection::Collection;
use crate::errors::DbError;
use std::path::Path;

/// Imports a seed file into `collection`.
///
/// # Errors
/// Returns an error if the file cannot be opened or a record is rejected.
pub fn import_file(
    collection: &Collection,
    path: impl AsRef<Path>,
    opts: &ImportOptions,
) -> Result<ImportReport, DbError> {
    let path = path.as_ref();
    log::info!("import: collection={}, path={}", collection.namespace(), path.display());
    let file = std::fs::File::open(path)
        .map_err(|e| DbError::Io(format!("{}: {e}", path.display())))?;
    let report = import_from_reader(collection, file, opts)?;
    log::info!("import done: inserted={} skipped={}", report.inserted, report.skipped);
    Ok(report)
}
