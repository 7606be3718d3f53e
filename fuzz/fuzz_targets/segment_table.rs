#![no_main]

use innostat::correlation::{correlate, MissingPolicy};
use innostat::csv_input::parse_segment_table;
use innostat::significance::SignificanceTester;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed tables must be rejected with an error, never a panic
    if let Ok(table) = parse_segment_table(data, ".") {
        let matrix = correlate(&table, MissingPolicy::Pairwise);
        let _ = SignificanceTester::default().test_matrix(&matrix);
    }
});
