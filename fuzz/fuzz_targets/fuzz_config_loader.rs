#![no_main]

use libfuzzer_sys::fuzz_target;
use traffic_light::config::TimingConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        // Parse and validate; only panics are interesting.
        if let Ok(timing) = TimingConfig::from_yaml_str(yaml_str) {
            assert!(timing.validate().is_ok());
        }
    }
});
