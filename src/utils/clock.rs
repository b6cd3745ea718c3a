#[cfg(test)]
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

use crate::config::Config;
use crate::model::attendance::AttendanceStatus;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Clone)]
pub struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

#[cfg(test)]
impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Arc::new(Mutex::new(at)))
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.0.lock() {
            *now += by;
        }
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// Office-day rules. The configured offset decides both the calendar date a
/// record belongs to and whether a check-in counts as late.
#[derive(Debug, Clone)]
pub struct Workday {
    pub offset: FixedOffset,
    pub late_after: NaiveTime,
    pub location: String,
}

impl Workday {
    pub fn from_config(config: &Config) -> Self {
        Self {
            offset: config.utc_offset,
            late_after: config.late_cutoff,
            location: config.default_location.clone(),
        }
    }

    pub fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Wall-clock time at the office, e.g. `08:30`.
    pub fn local_time(&self, at: DateTime<Utc>, format: &str) -> String {
        at.with_timezone(&self.offset).format(format).to_string()
    }

    /// Late only when strictly after the cutoff.
    pub fn status_at(&self, at: DateTime<Utc>) -> AttendanceStatus {
        if at.with_timezone(&self.offset).time() > self.late_after {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn workday(offset_hours: i32) -> Workday {
        Workday {
            offset: FixedOffset::east_opt(offset_hours * 3600).unwrap(),
            late_after: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            location: "Office".into(),
        }
    }

    #[test]
    fn cutoff_is_exclusive() {
        let day = workday(0);
        let at = |h, m, s| Utc.with_ymd_and_hms(2026, 3, 2, h, m, s).unwrap();
        assert_eq!(day.status_at(at(8, 30, 0)), AttendanceStatus::Present);
        assert_eq!(day.status_at(at(9, 0, 0)), AttendanceStatus::Present);
        assert_eq!(day.status_at(at(9, 0, 1)), AttendanceStatus::Late);
        assert_eq!(day.status_at(at(9, 15, 0)), AttendanceStatus::Late);
    }

    #[test]
    fn offset_moves_both_date_and_cutoff() {
        // 23:30 UTC is 08:30 the next morning at +09:00
        let day = workday(9);
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 23, 30, 0).unwrap();
        assert_eq!(day.date_of(at), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(day.status_at(at), AttendanceStatus::Present);
        assert_eq!(day.local_time(at, "%H:%M"), "08:30");
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
        clock.advance(chrono::Duration::minutes(90));
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap());
    }
}
