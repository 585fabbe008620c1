//! Inbound protocol requests and their responses.
//!
//! The protocol server's characteristic callbacks are reduced to these
//! values and handed to the run loop over a channel; the
//! [`StateController`](super::service::StateController) answers each one
//! with an [`AccessoryResponse`].

use super::ports::Characteristic;

/// Requests the protocol layer can make of the accessory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccessoryRequest {
    ReadPower,
    WritePower(bool),
    ReadTemperature,
    ReadHumidity,
    ReadAirQuality,
    Identify,
}

impl AccessoryRequest {
    /// The characteristic a read or write targets, if any.
    pub fn characteristic(self) -> Option<Characteristic> {
        match self {
            Self::ReadPower | Self::WritePower(_) => Some(Characteristic::PowerState),
            Self::ReadTemperature => Some(Characteristic::Temperature),
            Self::ReadHumidity => Some(Characteristic::Humidity),
            Self::ReadAirQuality => Some(Characteristic::AirQuality),
            Self::Identify => None,
        }
    }
}

/// Values returned to the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccessoryResponse {
    Bool(bool),
    Float(f32),
    UInt8(u8),
    /// Write or identify accepted.
    Ack,
    /// Write could not be completed (state was not persisted).
    Failed,
}
