#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(signature) = trino_types::TypeSignature::parse(text) {
            let _ = signature.to_string();
            let _ = signature.depth();
        }
    }
});
