//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements      | Connects to                  |
//! |------------|-----------------|------------------------------|
//! | `kv_store` | StoragePort     | in-memory map, directory     |
//! |            | ConfigPort      | in-memory map, JSON file     |
//! | `log_sink` | EventSink       | `log` facade                 |
//! | `replay`   | ObservationPort | latest signal values         |
//! | `time`     | ClockPort       | system wall clock            |

pub mod kv_store;
pub mod log_sink;
pub mod replay;
pub mod time;
