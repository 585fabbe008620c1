//! Fuzz target: `decode_frame`
//!
//! Any 5-byte frame either fails the checksum or yields finite values.
//!
//! cargo fuzz run fuzz_climate_frame

#![no_main]

use airsense::sensors::climate::decode_frame;
use critical_section as _;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|frame: [u8; 5]| {
    if let Ok(reading) = decode_frame(frame) {
        assert!(reading.temperature_c.is_finite());
        assert!(reading.humidity_pct.is_finite());
    }
});
