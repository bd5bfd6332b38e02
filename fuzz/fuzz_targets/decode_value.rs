#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use trino_types::{DecimalMode, DecodeOptions, TypeSignature, decode_value};

/// Fuzz input pairing a type signature with a JSON cell.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    signature: String,
    cell: Vec<u8>,
    lossy_decimals: bool,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(signature) = TypeSignature::parse(&input.signature) else {
        return;
    };
    let Ok(cell) = serde_json::from_slice::<serde_json::Value>(&input.cell) else {
        return;
    };
    let mode = if input.lossy_decimals {
        DecimalMode::Double
    } else {
        DecimalMode::Decimal
    };
    let _ = decode_value(&signature, &cell, &DecodeOptions::new().decimal_mode(mode));
});
