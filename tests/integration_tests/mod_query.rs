use bson::{Bson, doc};
use super::common::{num, seeded_books, titles};
use plp_bookstore::DbError;
use plp_bookstore::client::Client;
use plp_bookstore::export::ExportOptions;
use plp_bookstore::query::{Filter, FindOptions, SortSpec};

#[test]
fn equality_and_range_filters() {
    let (_client, books) = seeded_books();

    let adventure = books.find(&doc! {"genre": "Adventure"}, &FindOptions::default()).unwrap();
    assert_eq!(titles(&adventure), vec!["Treasure Island", "Into Thin Air", "The Lost City of Z"]);

    let orwell = books.find(&doc! {"author": "George Orwell"}, &FindOptions::default()).unwrap();
    assert_eq!(titles(&orwell), vec!["1984", "Animal Farm"]);

    assert_eq!(books.count(&doc! {"published_year": {"$gt": 1920}}).unwrap(), 16);
    assert_eq!(books.count(&doc! {"published_year": {"$gte": 2011, "$lt": 2014}}).unwrap(), 4);
    assert_eq!(books.count(&doc! {"genre": {"$in": ["Fantasy", "Mystery"]}}).unwrap(), 4);
    assert_eq!(books.count(&doc! {"genre": "Poetry"}).unwrap(), 0);
}

#[test]
fn sorted_projected_pages() {
    let (_client, books) = seeded_books();
    let filter = doc! {"inStock": true, "published_year": {"$gt": 2010}};
    let page = |sort: SortSpec, skip: usize| FindOptions {
        projection: Some(vec!["title".into(), "price".into()]),
        sort: Some(vec![sort]),
        limit: Some(5),
        skip: Some(skip),
    };

    let asc = books.find(&filter, &page(SortSpec::asc("price"), 0)).unwrap();
    let prices: Vec<f64> = asc.iter().map(|d| num(d, "price")).collect();
    assert_eq!(prices, vec![14.0, 15.99, 16.5, 17.25, 18.75]);
    assert!(asc.iter().all(|d| d.keys().count() == 2 && d.get("author").is_none()));

    let desc = books.find(&filter, &page(SortSpec::desc("price"), 0)).unwrap();
    assert_eq!(desc[0].get_str("title").unwrap(), "Project Hail Mary");
    assert_eq!(desc.len(), 5);

    let second = books.find(&filter, &page(SortSpec::asc("price"), 5)).unwrap();
    assert_eq!(titles(&second), vec!["Project Hail Mary"]);
    let past_end = books.find(&filter, &page(SortSpec::asc("price"), 50)).unwrap();
    assert!(past_end.is_empty());
}

#[test]
fn update_one_touches_first_match_only() {
    let (_client, books) = seeded_books();
    let r = books
        .update_one(&doc! {"title": "The Great Gatsby"}, &doc! {"$set": {"price": 500}})
        .unwrap();
    assert_eq!((r.matched, r.modified), (1, 1));
    let gatsby = books.find_one(&doc! {"title": "The Great Gatsby"}).unwrap().unwrap();
    assert_eq!(num(&gatsby, "price"), 500.0);

    // same value again: matched but not modified
    let again = books
        .update_one(&doc! {"title": "The Great Gatsby"}, &doc! {"$set": {"price": 500}})
        .unwrap();
    assert_eq!((again.matched, again.modified), (1, 0));

    let none = books.update_one(&doc! {"title": "Missing"}, &doc! {"$set": {"price": 1}}).unwrap();
    assert_eq!((none.matched, none.modified), (0, 0));

    let many = books
        .update_many(&doc! {"author": "Andy Weir"}, &doc! {"$inc": {"pages": 1}, "$unset": {"publisher": ""}})
        .unwrap();
    assert_eq!(many.modified, 2);
    let martian = books.find_one(&doc! {"title": "The Martian"}).unwrap().unwrap();
    assert_eq!(num(&martian, "pages"), 370.0);
    assert!(martian.get("publisher").is_none());
}

#[test]
fn delete_one_and_many() {
    let (_client, books) = seeded_books();
    assert_eq!(books.delete_one(&doc! {"title": "1984"}).unwrap().deleted, 1);
    assert_eq!(books.delete_one(&doc! {"title": "1984"}).unwrap().deleted, 0);
    assert!(books.find_one(&doc! {"title": "1984"}).unwrap().is_none());
    assert_eq!(books.delete_many(&doc! {"genre": "Adventure"}).unwrap().deleted, 3);
    assert_eq!(books.count(&doc! {}).unwrap(), 14);
}

#[test]
fn malformed_filters_are_query_errors() {
    let (_client, books) = seeded_books();
    let err = books.find(&doc! {"price": {"$regex": "x"}}, &FindOptions::default()).unwrap_err();
    assert!(matches!(err, DbError::QueryError(_)));
    let err = books.update_one(&doc! {}, &doc! {"$push": {"tags": "x"}}).unwrap_err();
    assert!(matches!(err, DbError::QueryError(_)));
}

#[test]
fn large_collections_are_returned_whole() {
    let client = Client::connect("memory://").unwrap();
    let shelf = client.database("plp_bookstore").collection("shelf");
    shelf.insert_many((0..10_001).map(|i| doc! {"n": i, "inStock": true})).unwrap();

    assert_eq!(shelf.find(&doc! {}, &FindOptions::default()).unwrap().len(), 10_001);
    assert_eq!(shelf.count(&doc! {}).unwrap(), 10_001);
    let matched = shelf
        .aggregate(&[doc! {"$match": {"inStock": true}}, doc! {"$count": "n"}])
        .unwrap();
    let unmatched = shelf.aggregate(&[doc! {"$count": "n"}]).unwrap();
    assert_eq!(num(&matched[0], "n"), 10_001.0);
    assert_eq!(matched, unmatched);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("shelf.ndjson");
    let opts = ExportOptions { filter: Some(Filter::eq("inStock", true)), ..ExportOptions::default() };
    assert_eq!(shelf.export_file(&out, &opts).unwrap().written, 10_001);

    let capped = FindOptions { limit: Some(10_000), ..FindOptions::default() };
    assert_eq!(shelf.find(&doc! {}, &capped).unwrap().len(), 10_000);
    let over = FindOptions { limit: Some(10_001), ..FindOptions::default() };
    assert!(matches!(shelf.find(&doc! {}, &over), Err(DbError::QueryError(_))));
}

#[test]
fn in_set_values_past_the_first_thousand_still_match() {
    let client = Client::connect("memory://").unwrap();
    let shelf = client.database("plp_bookstore").collection("shelf");
    shelf.insert_one(doc! {"published_year": 1000}).unwrap();
    let years: Vec<Bson> = (0..=999).map(Bson::Int32).collect();
    assert_eq!(shelf.count(&doc! {"published_year": {"$in": years.clone()}}).unwrap(), 0);
    let mut with_last = years;
    with_last[999] = Bson::Int32(1000);
    assert_eq!(shelf.count(&doc! {"published_year": {"$in": with_last.clone()}}).unwrap(), 1);
    with_last.push(Bson::Int32(1001));
    assert!(matches!(
        shelf.count(&doc! {"published_year": {"$in": with_last}}),
        Err(DbError::QueryError(_))
    ));
}

#[test]
fn conflicting_updates_leave_the_book_unchanged() {
    let (_client, books) = seeded_books();
    let gatsby = doc! {"title": "The Great Gatsby"};
    let before = books.find_one(&gatsby).unwrap().unwrap();

    let err = books.update_one(&gatsby, &doc! {"$set": {"price.amount": 5}}).unwrap_err();
    assert!(matches!(err, DbError::QueryError(_)));
    let err = books.update_one(&gatsby, &doc! {"$inc": {"author": 1}}).unwrap_err();
    assert!(matches!(err, DbError::QueryError(_)));
    let err = books
        .update_many(&doc! {"genre": "Fiction"}, &doc! {"$set": {"inStock": false}, "$inc": {"title": 1}})
        .unwrap_err();
    assert!(matches!(err, DbError::QueryError(_)));

    assert_eq!(books.find_one(&gatsby).unwrap().unwrap(), before);
    assert_eq!(books.count(&doc! {"genre": "Fiction", "inStock": true}).unwrap(), 4);

    let noop = books.update_one(&gatsby, &doc! {"$unset": {"publisher.city": ""}}).unwrap();
    assert_eq!((noop.matched, noop.modified), (1, 0));
    assert_eq!(books.find_one(&gatsby).unwrap().unwrap(), before);
}
