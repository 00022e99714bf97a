//! Wall clock and the date/time record answered to `getDateTime`.
//!
//! Record layout (16 bytes):
//!
//! | offset | size | field                          |
//! |--------|------|--------------------------------|
//! | 0      | 2    | year, big-endian               |
//! | 2      | 1    | month, 0-based                 |
//! | 3      | 1    | weekday, Sunday = 0            |
//! | 4      | 1    | hour                           |
//! | 5      | 1    | minute                         |
//! | 6      | 1    | second                         |
//! | 7      | 1    | weekday again                  |
//! | 8      | 2    | day of year, always 0          |
//! | 10     | 1    | DST flag, always 0             |
//! | 11     | 5    | zero                           |
//!
//! Day of year and DST are not computed.

use crate::abi::DATE_TIME_RECORD_LEN;
use chrono::{Datelike, NaiveDateTime, Timelike};

/// Source of local wall-clock time.
pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;
}

/// Local time of the host machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn date_time_record(now: &NaiveDateTime) -> [u8; DATE_TIME_RECORD_LEN] {
    let mut record = [0u8; DATE_TIME_RECORD_LEN];
    let year = now.year().clamp(0, u16::MAX as i32) as u16;
    let weekday = now.weekday().num_days_from_sunday() as u8;

    record[0..2].copy_from_slice(&year.to_be_bytes());
    record[2] = now.month0() as u8;
    record[3] = weekday;
    record[4] = now.hour() as u8;
    record[5] = now.minute() as u8;
    record[6] = now.second() as u8;
    record[7] = weekday;
    record
}
