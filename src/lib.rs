//! AirSense firmware library.
//!
//! Air-quality and climate accessory: samples a DHT22 and an analog gas
//! sensor, classifies air quality, persists a small state record and
//! feeds a smart-home protocol server through bounded channels.
//!
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, so the whole library builds and tests on the host.

#![deny(unused_must_use)]

pub mod app;
pub mod bridge;
pub mod classifier;
pub mod config;
pub mod display;
pub mod error;
pub mod notifier;
pub mod persistence;
pub mod pins;
pub mod sampler;
pub mod state;

pub mod adapters;
pub mod drivers;
pub mod sensors;

// Host tests use the `std` critical-section implementation for the bridge
// channels.
#[cfg(test)]
use critical_section as _;

#[cfg(test)]
mod test_log;
