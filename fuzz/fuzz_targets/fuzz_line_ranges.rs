#![no_main]

use libfuzzer_sys::fuzz_target;
use newcov_domain::{compact, decompact};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Bound the expansion of ranges like "1-4000000000".
    if text.len() > 64 || text.bytes().filter(u8::is_ascii_digit).count() > 6 {
        return;
    }
    if let Ok(mut lines) = decompact(text) {
        lines.sort_unstable();
        lines.dedup();
        assert_eq!(decompact(&compact(&lines)).ok(), Some(lines));
    }
});
