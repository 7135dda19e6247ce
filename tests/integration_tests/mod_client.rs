use bson::doc;
use plp_bookstore::client::{Client, ConnectionTarget};
use plp_bookstore::export::ExportOptions;
use plp_bookstore::import::{ImportFormat, ImportOptions};
use plp_bookstore::query::{FindOptions, Filter};
use plp_bookstore::DbError;
use tempfile::tempdir;

#[test]
fn connection_uris() {
    assert_eq!(ConnectionTarget::parse("memory://").unwrap(), ConnectionTarget::Memory);
    assert!(matches!(Client::connect("mongodb://localhost:27017"), Err(DbError::Connection(_))));
    assert!(matches!(Client::connect("  "), Err(DbError::Connection(_))));
    assert!(matches!(Client::connect("file://"), Err(DbError::Connection(_))));
}

#[test]
fn directory_store_survives_reconnect() {
    let dir = tempdir().unwrap();
    let uri = format!("file://{}", dir.path().display());
    {
        let client = Client::connect(&uri).unwrap();
        let db = client.database("plp_bookstore");
        let books = db.collection("books");
        books.import_file(&super::common::fixture_path(), &ImportOptions::default()).unwrap();
        books.create_index(plp_bookstore::index::IndexModel::from_keys(&doc! {"title": 1}).unwrap()).unwrap();
        db.collection("scratch").insert_one(doc! {"x": 1}).unwrap();
        assert!(db.drop_collection("scratch").unwrap());
        client.close().unwrap();
        assert!(client.is_closed());
    }

    let client = Client::connect(&uri).unwrap();
    assert_eq!(client.list_database_names().unwrap(), vec!["plp_bookstore"]);
    let db = client.database("plp_bookstore");
    assert_eq!(db.list_collection_names().unwrap(), vec!["books"]);
    let books = db.collection("books");
    assert_eq!(books.count(&doc! {}).unwrap(), 18);
    assert_eq!(books.list_indexes().unwrap()[0].name, "title_1");
    let first = books.find(&doc! {}, &FindOptions { limit: Some(1), ..FindOptions::default() }).unwrap();
    assert_eq!(first[0].get_str("title").unwrap(), "To Kill a Mockingbird");
}

#[test]
fn closed_client_rejects_operations() {
    let client = Client::connect("memory://").unwrap();
    let books = client.database("plp_bookstore").collection("books");
    books.insert_one(doc! {"title": "Dune"}).unwrap();
    client.close().unwrap();
    client.close().unwrap();
    assert!(matches!(books.count(&doc! {}), Err(DbError::ClientClosed)));
    assert!(matches!(books.insert_one(doc! {"title": "Emma"}), Err(DbError::ClientClosed)));
    assert!(matches!(client.list_database_names(), Err(DbError::ClientClosed)));
}

#[test]
fn import_skips_bad_lines_and_export_round_trips() {
    let dir = tempdir().unwrap();
    let seed = dir.path().join("seed.ndjson");
    std::fs::write(
        &seed,
        "{\"title\":\"Dune\",\"price\":9.5}\nnot json\n\n{\"title\":\"Emma\",\"price\":4}\n[1,2]\n",
    )
    .unwrap();
    let client = Client::connect("memory://").unwrap();
    let books = client.database("plp_bookstore").collection("books");

    let strict = books.import_file(&seed, &ImportOptions { format: ImportFormat::Ndjson, ..ImportOptions::default() });
    assert!(strict.is_err());
    books.delete_many(&doc! {}).unwrap();

    let sidecar = dir.path().join("rejected.ndjson");
    let opts = ImportOptions {
        skip_errors: true,
        error_sidecar: Some(sidecar.clone()),
        ..ImportOptions::default()
    };
    let report = books.import_file(&seed, &opts).unwrap();
    assert_eq!((report.inserted, report.skipped), (2, 2));
    assert_eq!(std::fs::read_to_string(&sidecar).unwrap().lines().count(), 2);

    let out = dir.path().join("export.ndjson");
    let exported = books
        .export_file(&out, &ExportOptions { filter: Some(Filter::eq("title", "Emma")), ..ExportOptions::default() })
        .unwrap();
    assert_eq!(exported.written, 1);
    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.contains("\"Emma\""));

    let array = dir.path().join("books.json");
    std::fs::write(&array, "[{\"title\":\"Beloved\"},{\"title\":\"Ulysses\"}]").unwrap();
    let r = books.import_file(&array, &ImportOptions::default()).unwrap();
    assert_eq!(r.inserted, 2);
    assert_eq!(books.count(&doc! {}).unwrap(), 4);
}
