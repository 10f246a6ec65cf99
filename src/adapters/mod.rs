//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                   |
//! |-------------|--------------------|-------------------------------|
//! | `broadcast` | BroadcastPort      | Peer outbox (radio task)      |
//! | `hardware`  | SensorPort         | Sensor front-end (simulated)  |
//! |             | IndicatorPort      | RGB LED + buzzer              |
//! | `log_sink`  | EventSink          | Serial log output             |
//! | `model`     | ModelPort          | Logistic model weights in NVS |
//! | `nvs`       | ConfigPort         | NVS / in-memory store         |
//! |             | StoragePort        |                               |
//! | `time`      | DelayNs            | ESP32 system timer / FreeRTOS |

pub mod broadcast;
pub mod hardware;
pub mod log_sink;
pub mod model;
pub mod nvs;
pub mod time;
