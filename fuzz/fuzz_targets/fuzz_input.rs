// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nomnom::naming::{finalize_suggestion, split_extension, validate_file_name, CaseStyle};

#[derive(Arbitrary, Debug)]
struct Input {
    raw: String,
    original: String,
    case: u8,
}

fuzz_target!(|input: Input| {
    let case = match input.case % 4 {
        0 => CaseStyle::Snake,
        1 => CaseStyle::Kebab,
        2 => CaseStyle::Camel,
        _ => CaseStyle::Pascal,
    };

    if let Ok(name) = finalize_suggestion(&input.raw, &input.original, case) {
        let needs_extension = split_extension(&input.original).1.is_some();
        assert!(validate_file_name(&name, needs_extension).is_ok(), "{:?}", name);
    }
});
