use bson::doc;
use plp_bookstore::client::Client;
use plp_bookstore::query::{FindOptions, SortSpec};
use proptest::prelude::*;

fn prices(docs: &[bson::Document]) -> Vec<i64> {
    docs.iter().map(|d| d.get_i64("price").unwrap()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 48, ..ProptestConfig::default() })]

    #[test]
    fn ascending_is_reverse_of_descending(set in proptest::collection::btree_set(0i64..10_000, 0..40)) {
        let client = Client::connect("memory://").unwrap();
        let books = client.database("p").collection("books");
        books.insert_many(set.iter().map(|p| doc! {"price": *p, "inStock": true})).unwrap();

        let opts = |s: SortSpec| FindOptions { sort: Some(vec![s]), ..FindOptions::default() };
        let asc = prices(&books.find(&doc! {}, &opts(SortSpec::asc("price"))).unwrap());
        let mut desc = prices(&books.find(&doc! {}, &opts(SortSpec::desc("price"))).unwrap());
        prop_assert!(asc.windows(2).all(|w| w[0] < w[1]));
        desc.reverse();
        prop_assert_eq!(asc, desc);
    }

    #[test]
    fn pages_partition_the_sorted_result(
        set in proptest::collection::btree_set(0i64..1_000, 0..30),
        page_size in 1usize..7,
    ) {
        let client = Client::connect("memory://").unwrap();
        let books = client.database("p").collection("books");
        books.insert_many(set.iter().map(|p| doc! {"price": *p})).unwrap();

        let mut stitched = Vec::new();
        for page in 0..=set.len() / page_size {
            let opts = FindOptions {
                sort: Some(vec![SortSpec::asc("price")]),
                skip: Some(page * page_size),
                limit: Some(page_size),
                ..FindOptions::default()
            };
            let chunk = books.find(&doc! {}, &opts).unwrap();
            prop_assert!(chunk.len() <= page_size);
            stitched.extend(prices(&chunk));
        }
        prop_assert_eq!(stitched, set.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn range_filter_matches_manual_count(
        years in proptest::collection::vec(1800i64..2030, 0..40),
        after in 1800i64..2030,
    ) {
        let client = Client::connect("memory://").unwrap();
        let books = client.database("p").collection("books");
        books.insert_many(years.iter().map(|y| doc! {"published_year": *y})).unwrap();

        let expected = years.iter().filter(|y| **y > after).count() as u64;
        prop_assert_eq!(books.count(&doc! {"published_year": {"$gt": after}}).unwrap(), expected);
        let found = books.find(&doc! {"published_year": {"$gt": after}}, &FindOptions::default()).unwrap();
        prop_assert!(found.iter().all(|d| d.get_i64("published_year").unwrap() > after));
        let rest = books.count(&doc! {"published_year": {"$lte": after}}).unwrap();
        prop_assert_eq!(expected + rest, years.len() as u64);
    }
}
