//! Fuzz target: `AccessoryState::decode`
//!
//! Feeds arbitrary bytes to the persisted-record decoder. It must never
//! panic, and anything it accepts must re-encode to the same bytes.
//!
//! cargo fuzz run fuzz_state_record

#![no_main]

use airsense::state::AccessoryState;
use critical_section as _;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Some(state) = AccessoryState::decode(data) {
        let encoded = state.encode().expect("decoded state must re-encode");
        // NaN payloads compare unequal as floats, so compare bytes.
        assert_eq!(&encoded[..], data, "record did not re-encode identically");
    }
});
