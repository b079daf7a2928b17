#![no_main]

use libfuzzer_sys::fuzz_target;
use soaktrace::trace::{parse_line, parse_trace_str};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Neither a single line nor a whole trace may panic
        let _ = parse_line(input);
        let _ = parse_trace_str(input);
    }
});
