//! Wall-clock adapter.
//!
//! The estimator only ever sees explicit [`Timestamp`]s; live hosts ask a
//! [`ClockPort`] for "now" and pass it down.

use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;

use crate::app::ports::ClockPort;
use crate::estimator::Timestamp;

/// System wall clock, millisecond resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> Timestamp {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => Timestamp::from_millis(i64::try_from(d.as_millis()).unwrap_or(i64::MAX)),
            Err(_) => {
                warn!("System clock is before the Unix epoch");
                Timestamp::default()
            }
        }
    }
}
