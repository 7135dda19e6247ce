#![allow(dead_code)]

use bson::{Bson, Document as BsonDocument};
use plp_bookstore::client::{Client, CollectionRef};
use plp_bookstore::import::ImportOptions;
use std::path::PathBuf;

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join("books.ndjson")
}

/// In-memory client with the fixture loaded into `plp_bookstore.books`.
pub fn seeded_books() -> (Client, CollectionRef) {
    let client = Client::connect("memory://").unwrap();
    let books = client.database("plp_bookstore").collection("books");
    let report = books.import_file(&fixture_path(), &ImportOptions::default()).unwrap();
    assert_eq!(report.inserted, 18);
    (client, books)
}

pub fn num(doc: &BsonDocument, key: &str) -> f64 {
    match doc.get(key) {
        Some(Bson::Int32(v)) => f64::from(*v),
        #[allow(clippy::cast_precision_loss)]
        Some(Bson::Int64(v)) => *v as f64,
        Some(Bson::Double(v)) => *v,
        other => panic!("{key} is not numeric: {other:?}"),
    }
}

pub fn titles(docs: &[BsonDocument]) -> Vec<String> {
    docs.iter().map(|d| d.get_str("title").unwrap().to_string()).collect()
}
