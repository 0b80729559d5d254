#![no_main]

use libfuzzer_sys::fuzz_target;
use newcov_adapters_diff::parse_diff;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Malformed hunk headers are errors, never panics.
    if let Ok(diff) = parse_diff(text) {
        let added: usize = diff.iter().map(|(_, lines)| lines.len()).sum();
        assert!(added <= text.lines().count());
    }
});
