#![no_main]
use libfuzzer_sys::fuzz_target;
use plp_bookstore::document::Document;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 {
        return;
    }
    let Ok(s) = std::str::from_utf8(data) else { return };
    if let Ok(update) = plp_bookstore::query::parse_update_json(s) {
        let mut d = Document::new(bson::doc! {"title": "Dune", "price": 9, "meta": {"pages": 412}});
        let _ = plp_bookstore::query::apply_update(&mut d, &update);
    }
});
