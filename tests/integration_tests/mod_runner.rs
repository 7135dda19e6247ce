use bson::doc;
use super::common::{fixture_path, num, seeded_books, titles};
use plp_bookstore::config::AppConfig;
use plp_bookstore::{DbError, QueryRunner, QuerySettings, Step, StepOutput, run_queries};

fn docs(output: Option<&StepOutput>) -> &[bson::Document] {
    match output {
        Some(StepOutput::Documents(d)) => d.as_slice(),
        other => panic!("expected documents, got {other:?}"),
    }
}

fn status(output: Option<&StepOutput>) -> &str {
    match output {
        Some(StepOutput::Status(s)) => s.as_str(),
        other => panic!("expected status, got {other:?}"),
    }
}

#[test]
fn full_script_against_fixture() {
    let (_client, books) = seeded_books();
    let runner = QueryRunner::new(&books, QuerySettings::default());
    let mut out = Vec::new();
    let report = runner.run(&mut out).unwrap();
    assert_eq!(report.steps.len(), Step::ALL.len());

    assert_eq!(docs(report.get(Step::BooksInGenre)).len(), 3);
    assert_eq!(docs(report.get(Step::BooksPublishedAfter)).len(), 16);
    assert_eq!(titles(docs(report.get(Step::BooksByAuthor))), vec!["1984", "Animal Farm"]);
    assert_eq!(status(report.get(Step::UpdatePrice)), "matched 1, modified 1");
    assert_eq!(status(report.get(Step::DeleteByTitle)), "deleted 1");

    let asc = docs(report.get(Step::InStockRecentAscending));
    assert_eq!(asc.len(), 5);
    assert_eq!(asc[0].get_str("title").unwrap(), "Where the Crawdads Sing");
    assert!(asc.iter().all(|d| d.keys().all(|k| ["title", "author", "price"].contains(&k.as_str()))));
    let desc = docs(report.get(Step::InStockRecentDescending));
    assert_eq!(desc[0].get_str("title").unwrap(), "Project Hail Mary");
    assert_eq!(num(&desc[4], "price"), 15.99);

    // the average reflects the price update made earlier in the run
    let avg = docs(report.get(Step::AveragePriceByGenre));
    let fiction = avg.iter().find(|d| d.get_str("_id").unwrap() == "Fiction").unwrap();
    assert!((num(fiction, "averagePrice") - 135.1825).abs() < 1e-9);

    let authors = docs(report.get(Step::BooksPerAuthor));
    assert_eq!(authors.len(), 16);
    assert_eq!(authors[0].get_str("_id").unwrap(), "Andy Weir");
    let orwell = authors.iter().find(|d| d.get_str("_id").unwrap() == "George Orwell").unwrap();
    assert_eq!(num(orwell, "bookCount"), 1.0);

    let decades = docs(report.get(Step::BooksByDecade));
    let total: f64 = decades.iter().map(|d| num(d, "count")).sum();
    assert_eq!(total, 17.0);

    assert_eq!(status(report.get(Step::CreateTitleIndex)), "title_1");
    assert_eq!(status(report.get(Step::CreateAuthorYearIndex)), "author_1_published_year_-1");
    match report.get(Step::ExplainTitleQuery) {
        Some(StepOutput::Stats(stats)) => {
            assert_eq!(stats.get_i64("nReturned").unwrap(), 1);
            assert_eq!(stats.get_i64("totalDocsExamined").unwrap(), 1);
        }
        other => panic!("expected stats, got {other:?}"),
    }

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("Adventure Books:\n"));
    assert!(text.contains("Updated price of The Great Gatsby. (matched 1, modified 1)"));
    assert!(text.contains("Deleted book titled 1984. (deleted 1)"));
    assert!(text.contains("Compound index created on author and published_year"));
    assert!(text.contains("Explain Result:"));
    assert_eq!(books.find_one(&doc! {"title": "1984"}).unwrap(), None);
}

#[test]
fn a_failing_step_stops_the_script() {
    let (client, books) = seeded_books();
    let runner = QueryRunner::new(&books, QuerySettings::default());
    client.close().unwrap();
    let mut out = Vec::new();
    let err = runner.run(&mut out).unwrap_err();
    assert!(matches!(err, DbError::ClientClosed));
    assert!(out.is_empty());
}

#[test]
fn run_queries_seeds_once_and_always_closes() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = AppConfig {
        uri: format!("file://{}", dir.path().display()),
        seed_file: Some(fixture_path()),
        ..AppConfig::default()
    };

    let mut out = Vec::new();
    let first = run_queries(&cfg, &mut out).unwrap();
    assert_eq!(first.steps.len(), 13);
    assert!(String::from_utf8(out).unwrap().starts_with("Connected to file://"));
    let snapshot = dir.path().join("plp_bookstore.books.ndjson");
    assert_eq!(std::fs::read_to_string(&snapshot).unwrap().lines().count(), 17);

    // data already present: no reseed, 1984 is gone, index declarations are reused
    let second = run_queries(&cfg, &mut Vec::new()).unwrap();
    assert_eq!(status(second.get(Step::DeleteByTitle)), "deleted 0");
    assert!(status(second.get(Step::UpdatePrice)).starts_with("matched 1"));
    assert_eq!(status(second.get(Step::CreateTitleIndex)), "title_1");
}

#[test]
fn run_queries_reports_seed_failure_after_closing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = AppConfig {
        uri: format!("file://{}", dir.path().display()),
        seed_file: Some(dir.path().join("missing.ndjson")),
        ..AppConfig::default()
    };
    let mut out = Vec::new();
    assert!(run_queries(&cfg, &mut out).is_err());
    // the close on the failure path still flushed the (empty) collection
    assert!(dir.path().join("plp_bookstore.books.ndjson").exists());

    let bad_uri = AppConfig { uri: "mongodb://localhost:27017".into(), ..AppConfig::default() };
    assert!(matches!(run_queries(&bad_uri, &mut Vec::new()), Err(DbError::Connection(_))));
}

#[test]
fn in_stock_pages_mirror_each_other_with_five_matches() {
    let (_client, books) = seeded_books();
    assert_eq!(books.delete_one(&doc! {"title": "The Night Circus"}).unwrap().deleted, 1);
    let runner = QueryRunner::new(&books, QuerySettings::default());
    let report = runner
        .run_steps(&[Step::InStockRecentAscending, Step::InStockRecentDescending], &mut Vec::new())
        .unwrap();

    let asc = docs(report.get(Step::InStockRecentAscending));
    let desc = docs(report.get(Step::InStockRecentDescending));
    assert_eq!(asc.len(), 5);
    assert_eq!(asc.iter().rev().cloned().collect::<Vec<_>>(), desc.to_vec());
    for d in asc {
        let mut keys: Vec<&str> = d.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["author", "price", "title"]);
        let full = books.find_one(&doc! {"title": d.get_str("title").unwrap()}).unwrap().unwrap();
        assert!(full.get_bool("inStock").unwrap());
        assert!(num(&full, "published_year") > 2010.0);
    }
}

#[test]
fn broken_seed_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let seed = dir.path().join("seed.ndjson");
    std::fs::write(&seed, "{\"title\":\"Emma\",\"genre\":\"Romance\"}\nnot json\n").unwrap();
    let cfg = AppConfig {
        uri: format!("file://{}", dir.path().display()),
        seed_file: Some(seed.clone()),
        ..AppConfig::default()
    };
    let snapshot = dir.path().join("plp_bookstore.books.ndjson");

    for _ in 0..2 {
        assert!(run_queries(&cfg, &mut Vec::new()).is_err());
        assert_eq!(std::fs::read_to_string(&snapshot).unwrap().lines().count(), 0);
    }

    std::fs::copy(fixture_path(), &seed).unwrap();
    let report = run_queries(&cfg, &mut Vec::new()).unwrap();
    assert_eq!(report.steps.len(), 13);
    assert_eq!(std::fs::read_to_string(&snapshot).unwrap().lines().count(), 17);
}
