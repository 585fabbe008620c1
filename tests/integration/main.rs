//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters. All tests run on the host (x86_64) with no
//! real hardware required.

// Links the `std` critical-section implementation used by the bridge
// channels.
use critical_section as _;

mod bridge_tests;
mod controller_tests;
mod scenario_tests;
