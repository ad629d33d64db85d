#![no_main]

use libfuzzer_sys::fuzz_target;

use roomsieve::censor;

fuzz_target!(|data: &[u8]| {
    // Convert raw bytes to string, handling invalid UTF-8 gracefully
    let text = String::from_utf8_lossy(data).to_string();

    // Redaction must never panic, and a second pass must be a no-op.
    let once = censor::censor_text(&text);
    let twice = censor::censor_text(&once);
    assert_eq!(once, twice);

    let _ = censor::has_sensitive_data(&text);
    let _ = censor::censorship_stats(&text);
});
