#![no_main]
use libfuzzer_sys::fuzz_target;
use plp_bookstore::collection::Collection;
use plp_bookstore::import::{ImportOptions, import_from_reader};
use plp_bookstore::types::Namespace;

fuzz_target!(|data: &[u8]| {
    if data.len() > 16384 {
        return;
    }
    let col = Collection::new(Namespace::new("fuzz", "books"));
    let opts = ImportOptions { skip_errors: true, ..ImportOptions::default() };
    let _ = import_from_reader(&col, std::io::Cursor::new(data), &opts);
});
