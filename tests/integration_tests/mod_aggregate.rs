use bson::{Bson, doc};
use super::common::{num, seeded_books};
use plp_bookstore::DbError;
use plp_bookstore::aggregate::Pipeline;

#[test]
fn average_price_per_genre_first_seen() {
    let (_client, books) = seeded_books();
    let out = books
        .aggregate(&[doc! {"$group": {"_id": "$genre", "averagePrice": {"$avg": "$price"}}}])
        .unwrap();
    let genres: Vec<&str> = out.iter().map(|d| d.get_str("_id").unwrap()).collect();
    assert_eq!(genres.len(), 9);
    assert_eq!(&genres[..3], &["Fiction", "Dystopian", "Fantasy"]);
    let fiction = num(&out[0], "averagePrice");
    assert!((fiction - 12.68).abs() < 1e-9, "fiction avg {fiction}");
}

#[test]
fn author_counts_sorted_by_count_then_name() {
    let (_client, books) = seeded_books();
    let out = books
        .aggregate(&[
            doc! {"$group": {"_id": "$author", "bookCount": {"$sum": 1}}},
            doc! {"$sort": {"bookCount": -1, "_id": 1}},
        ])
        .unwrap();
    assert_eq!(out.len(), 16);
    assert_eq!(out[0].get_str("_id").unwrap(), "Andy Weir");
    assert_eq!(num(&out[0], "bookCount"), 2.0);
    assert_eq!(out[1].get_str("_id").unwrap(), "George Orwell");
    assert_eq!(num(&out[2], "bookCount"), 1.0);
    assert_eq!(out[2].get_str("_id").unwrap(), "Aldous Huxley");
}

#[test]
fn books_by_decade_projection() {
    let (_client, books) = seeded_books();
    let out = books
        .aggregate(&[
            doc! {"$group": {
                "_id": {"$floor": {"$divide": ["$published_year", 10]}},
                "count": {"$sum": 1},
            }},
            doc! {"$project": {"decade": {"$multiply": ["$_id", 10]}, "count": 1, "_id": 0}},
        ])
        .unwrap();
    assert_eq!(out.len(), 11);
    assert_eq!(num(&out[0], "decade"), 1960.0);
    let twenty_tens = out.iter().find(|d| num(d, "decade") == 2010.0).unwrap();
    assert_eq!(num(twenty_tens, "count"), 6.0);
    let total: f64 = out.iter().map(|d| num(d, "count")).sum();
    assert_eq!(total, 18.0);
    assert!(out.iter().all(|d| !d.contains_key("_id")));
}

#[test]
fn leading_match_then_group() {
    let (_client, books) = seeded_books();
    let out = books
        .aggregate(&[
            doc! {"$match": {"inStock": false}},
            doc! {"$group": {"_id": Bson::Null, "n": {"$sum": 1}, "cheapest": {"$min": "$price"}}},
        ])
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(num(&out[0], "n"), 3.0);
    assert_eq!(num(&out[0], "cheapest"), 8.5);

    let counted = books
        .aggregate(&[doc! {"$match": {"genre": "Adventure"}}, doc! {"$count": "adventures"}])
        .unwrap();
    assert_eq!(num(&counted[0], "adventures"), 3.0);
}

#[test]
fn bad_pipelines_fail_cleanly() {
    let (_client, books) = seeded_books();
    assert!(matches!(
        books.aggregate(&[doc! {"$lookup": {"from": "authors"}}]),
        Err(DbError::QueryError(_))
    ));
    assert!(matches!(
        books.aggregate(&[doc! {"$project": {"title": 1, "price": 0}}]),
        Err(DbError::QueryError(_))
    ));
    assert!(matches!(
        books.aggregate(&[doc! {"$project": {"r": {"$divide": ["$price", 0]}}}]),
        Err(DbError::QueryError(_))
    ));
    assert!(Pipeline::from_json("[{\"$limit\": 2}]").is_ok());
    assert!(Pipeline::from_json("{\"$limit\": 2}").is_err());
}

#[test]
fn constant_label_groups_everything_through_the_engine() {
    let client = plp_bookstore::Client::connect("memory://").unwrap();
    let books = client.database("plp_bookstore").collection("books");
    books
        .insert_many([doc! {"author": "X"}, doc! {"author": "X"}, doc! {"author": "Y"}])
        .unwrap();
    let fixed = books
        .aggregate(&[
            doc! {"$group": {"_id": "$author", "bookCount": {"$sum": 1}}},
            doc! {"$sort": {"bookCount": -1, "_id": 1}},
        ])
        .unwrap();
    assert_eq!(fixed, vec![doc! {"_id": "X", "bookCount": 2}, doc! {"_id": "Y", "bookCount": 1}]);

    let constant = books
        .aggregate(&[doc! {"$group": {"_id": "author", "bookCount": {"$sum": 1}}}])
        .unwrap();
    assert_eq!(constant, vec![doc! {"_id": "author", "bookCount": 3}]);
}
