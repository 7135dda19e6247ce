#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 {
        return;
    }
    let Ok(s) = std::str::from_utf8(data) else { return };
    if let Ok(filter) = plp_bookstore::query::parse_filter_json(s) {
        let books = [
            bson::doc! {"title": "Dune", "price": 9.5, "published_year": 1965, "inStock": true},
            bson::doc! {"title": "Emma", "author": {"name": "Jane Austen"}, "published_year": 1815_i64},
            bson::doc! {"genre": null},
        ];
        for b in &books {
            let _ = plp_bookstore::query::eval_filter(b, &filter);
        }
    }
});
