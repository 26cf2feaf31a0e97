//! services/cli/src/adapters/clock.rs
//!
//! The production `Clock`: today's date on the UTC calendar, which is the
//! calendar the Classroom API uses for due dates.

use chrono::{NaiveDate, Utc};
use coursework_core::ports::Clock;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}
