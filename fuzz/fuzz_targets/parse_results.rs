#![no_main]

use libfuzzer_sys::fuzz_target;
use trino_protocol::QueryResults;

fuzz_target!(|data: &[u8]| {
    if let Ok(page) = QueryResults::from_slice(data) {
        let _ = page.validate();
        let _ = page.engine_state();
        let _ = page.row_count();
    }
});
