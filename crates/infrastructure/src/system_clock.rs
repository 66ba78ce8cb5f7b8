use chrono::{NaiveDateTime, Utc};

use respsync_application::Clock;

/// Wall clock reporting UTC without an offset, matching the naive
/// timestamps stored for assignment windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}
