use crate::collection::Collection;
use crate::document::Document;
use crate::errors::DbError;
use crate::query::json_value_to_document;
use crate::utils::num::usize_to_u64;
use bson::Document as BsonDocument;
use std::io::{BufRead, BufReader, Read, Write};

use super::options::{ImportFormat, ImportOptions, ImportReport};

/// Inserts every record from `reader`, one JSON object per line or a single JSON array.
///
/// Records are staged first and inserted only once the whole input has been read,
/// so a failed import leaves the collection as it was.
///
/// # Errors
/// Fails on I/O errors, and on the first bad record unless `skip_errors` is set.
pub fn import_from_reader<R: Read>(
    collection: &Collection,
    reader: R,
    opts: &ImportOptions,
) -> Result<ImportReport, DbError> {
    let mut reader = BufReader::new(reader);
    let format = match opts.format {
        ImportFormat::Auto if starts_with_bracket(&mut reader)? => ImportFormat::JsonArray,
        ImportFormat::Auto => ImportFormat::Ndjson,
        other => other,
    };
    let (staged, skipped) = if format == ImportFormat::JsonArray {
        (read_array(reader)?, 0)
    } else {
        read_lines(reader, opts)?
    };
    let report = ImportReport { inserted: usize_to_u64(staged.len()), skipped };
    for (n, data) in staged.into_iter().enumerate() {
        collection.insert_document(Document::new(data));
        if let Some(every) = opts.progress_every
            && every > 0
            && (n + 1) % every == 0
        {
            log::info!("imported {} records", n + 1);
        }
    }
    Ok(report)
}

fn read_array<R: Read>(reader: BufReader<R>) -> Result<Vec<BsonDocument>, DbError> {
    let val: serde_json::Value = serde_json::from_reader(reader)?;
    let serde_json::Value::Array(items) = val else {
        return Err(DbError::Bson("expected a JSON array of documents".into()));
    };
    items.into_iter().map(json_value_to_document).collect()
}

fn read_lines<R: Read>(
    mut reader: BufReader<R>,
    opts: &ImportOptions,
) -> Result<(Vec<BsonDocument>, u64), DbError> {
    let mut sidecar = match &opts.error_sidecar {
        Some(p) if opts.skip_errors => Some(std::fs::File::create(p)?),
        _ => None,
    };
    let mut staged = Vec::new();
    let mut skipped: u64 = 0;
    let mut line_no: usize = 0;
    let mut buf = String::with_capacity(8 * 1024);
    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = buf.trim();
        if line.is_empty() {
            continue;
        }
        let parsed = serde_json::from_str::<serde_json::Value>(line)
            .map_err(DbError::from)
            .and_then(json_value_to_document);
        match parsed {
            Ok(data) => staged.push(data),
            Err(e) if opts.skip_errors => {
                log::warn!("skipping line {line_no}: {e}");
                if let Some(f) = sidecar.as_mut() {
                    let rec = serde_json::json!({"line": line_no, "error": e.to_string(), "record": line});
                    writeln!(f, "{rec}")?;
                }
                skipped += 1;
            }
            Err(e) => {
                log::error!("import failed at line {line_no}: {e}");
                return Err(e);
            }
        }
    }
    Ok((staged, skipped))
}

fn starts_with_bracket<R: Read>(reader: &mut BufReader<R>) -> Result<bool, DbError> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(false);
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(i) => {
                let first = buf[i];
                reader.consume(i);
                return Ok(first == b'[');
            }
            None => {
                let n = buf.len();
                reader.consume(n);
            }
        }
    }
}
