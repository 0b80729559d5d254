#![no_main]

use libfuzzer_sys::fuzz_target;
use newcov_adapters_coverage::parse_report;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    // Every row name maps onto a source path.
    if let Ok(coverage) = parse_report(&text) {
        for (path, _) in coverage.iter() {
            assert!(path.ends_with(".py"));
        }
    }
});
