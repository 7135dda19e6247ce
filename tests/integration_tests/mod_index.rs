use bson::doc;
use super::common::{seeded_books, titles};
use plp_bookstore::DbError;
use plp_bookstore::index::IndexModel;
use plp_bookstore::query::{FindOptions, WinningPlan};

#[test]
fn create_list_drop() {
    let (_client, books) = seeded_books();
    let title = books.create_index(IndexModel::from_keys(&doc! {"title": 1}).unwrap()).unwrap();
    assert_eq!(title, "title_1");
    let compound = books
        .create_index(IndexModel::from_keys(&doc! {"author": 1, "published_year": -1}).unwrap())
        .unwrap();
    assert_eq!(compound, "author_1_published_year_-1");

    // re-declaring the same keys is a no-op returning the existing name
    let again = books.create_index(IndexModel::from_keys(&doc! {"title": 1}).unwrap()).unwrap();
    assert_eq!(again, "title_1");

    let listed = books.list_indexes().unwrap();
    let names: Vec<&str> = listed.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["author_1_published_year_-1", "title_1"]);
    let ix = listed.iter().find(|d| d.name == "title_1").unwrap();
    assert_eq!(ix.key, doc! {"title": 1});
    assert_eq!(ix.stats.entries, 18);

    assert!(books.drop_index("title_1").unwrap());
    assert!(!books.drop_index("title_1").unwrap());
    assert_eq!(books.list_indexes().unwrap().len(), 1);
}

#[test]
fn conflicting_declarations_are_index_errors() {
    let (_client, books) = seeded_books();
    books.create_index(IndexModel::from_keys(&doc! {"title": 1}).unwrap().with_name("by_title")).unwrap();
    let clash = books.create_index(IndexModel::from_keys(&doc! {"price": 1}).unwrap().with_name("by_title"));
    assert!(matches!(clash, Err(DbError::IndexError(_))));
    let dup = books.create_index(IndexModel::from_keys(&doc! {"title": 1}).unwrap());
    assert!(matches!(dup, Err(DbError::IndexError(_))));
    assert!(IndexModel::from_keys(&doc! {}).is_err());
    assert!(IndexModel::from_keys(&doc! {"title": "text"}).is_err());
}

#[test]
fn explain_reports_plan_and_counters() {
    let (_client, books) = seeded_books();
    let filter = doc! {"title": "The Great Gatsby"};

    let scan = books.explain(&filter, &FindOptions::default()).unwrap();
    assert_eq!(scan.winning_plan, WinningPlan::CollectionScan);
    assert_eq!(scan.execution_stats.total_docs_examined, 18);
    assert_eq!(scan.execution_stats.total_keys_examined, 0);
    assert_eq!(scan.execution_stats.n_returned, 1);
    assert!(scan.execution_stats.execution_success);

    books.create_index(IndexModel::from_keys(&doc! {"title": 1}).unwrap()).unwrap();
    let ix = books.explain(&filter, &FindOptions::default()).unwrap();
    assert_eq!(ix.winning_plan.stage(), "IXSCAN");
    assert_eq!(ix.execution_stats.total_docs_examined, 1);
    assert_eq!(ix.execution_stats.n_returned, 1);
    assert_eq!(ix.namespace, "plp_bookstore.books");

    let stats = ix.execution_stats_document();
    assert_eq!(stats.get_i64("nReturned").unwrap(), 1);
    assert_eq!(stats.get_i64("totalDocsExamined").unwrap(), 1);
    assert!(stats.get_bool("executionSuccess").unwrap());
}

#[test]
fn indexed_results_match_collection_scan() {
    let (_client, books) = seeded_books();
    let filter = doc! {"author": "George Orwell", "inStock": true};
    let before = books.find(&filter, &FindOptions::default()).unwrap();
    books
        .create_index(IndexModel::from_keys(&doc! {"author": 1, "published_year": -1}).unwrap())
        .unwrap();
    let after = books.find(&filter, &FindOptions::default()).unwrap();
    assert_eq!(titles(&before), vec!["1984"]);
    assert_eq!(before, after);

    // writes after the build stay visible through the index
    books.insert_one(doc! {"title": "Homage to Catalonia", "author": "George Orwell", "inStock": true}).unwrap();
    books.delete_one(&doc! {"title": "1984"}).unwrap();
    let now = books.find(&filter, &FindOptions::default()).unwrap();
    assert_eq!(titles(&now), vec!["Homage to Catalonia"]);
}
