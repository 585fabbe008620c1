//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules for the AirSense accessory:
//! power state handling, rate-limited sampling, air-quality classification,
//! persistence policy and periodic notifications. All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
