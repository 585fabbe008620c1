//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                 |
//! |------------|---------------------|-----------------------------|
//! | `display`  | DisplayPort         | SH1107 OLED over I2C        |
//! | `hardware` | ClimateSensorPort   | DHT22 on GPIO25             |
//! |            | AirQualityPort      | ADC1_CH0 (GPIO36)           |
//! |            | OutputPort          | Indicator GPIO              |
//! | `log_sink` | EventSink           | Serial log output           |
//! | `nvs`      | KeyValueStore       | NVS / in-memory store       |
//! | `time`     | ClockPort           | ESP32 system timer          |

pub mod display;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
