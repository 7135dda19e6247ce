#![no_main]
use libfuzzer_sys::fuzz_target;
use plp_bookstore::aggregate::Pipeline;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 {
        return;
    }
    let Ok(s) = std::str::from_utf8(data) else { return };
    if let Ok(p) = Pipeline::from_json(s) {
        let docs = vec![
            bson::doc! {"genre": "Fiction", "price": 12.5, "published_year": 1925},
            bson::doc! {"genre": "Fiction", "price": 3, "published_year": 2011},
            bson::doc! {"author": "Orwell"},
        ];
        let _ = p.execute(docs);
    }
});
