#![no_main]

use innostat::cleaner::clean;
use innostat::config::CleaningConfig;
use innostat::csv_input::parse_raw_table;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes, including invalid UTF-8, must never panic the cleaner
    if let Ok(raw) = parse_raw_table(data) {
        let _ = clean(&raw, &CleaningConfig::default(), None);
    }
});
