//! Time sources for timestamps and debounce deadlines.

use chrono::{Local, NaiveDateTime};
use std::cell::Cell;
use std::rc::Rc;

/// Wall clock in Unix epoch milliseconds plus the local time used by
/// date/time insertion.
pub trait Clock {
    fn now_ms(&self) -> i64;

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Local::now().timestamp_millis()
    }
}

/// Manually advanced clock. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.set(self.now_ms.get() + delta_ms);
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.set(now_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.get()
    }

    fn local_now(&self) -> NaiveDateTime {
        chrono::DateTime::from_timestamp_millis(self.now_ms.get())
            .map(|instant| instant.naive_utc())
            .unwrap_or_default()
    }
}
