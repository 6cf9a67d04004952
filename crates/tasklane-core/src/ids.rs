//! Timestamp-derived task ids.
//!
//! An id is the unpadded digits of the local creation time: years since
//! 1900, zero-based month, day, hour, minute, second and millisecond, so
//! 2026-10-19 09:05:03.042 becomes `12691995342`. Two
//! creations inside the same millisecond compose the same digits; the
//! caller resolves that with [`unique_id`].

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};

use crate::store::Snapshot;
use crate::task::TaskId;

pub fn compose_id<Tz: TimeZone>(at: &DateTime<Tz>) -> TaskId {
    let millis = at.timestamp_subsec_millis().min(999);
    let digits = format!(
        "{}{}{}{}{}{}{}",
        at.year() - 1900,
        at.month0(),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        millis
    );
    TaskId::new(digits)
}

/// Composes the id for `at`, suffixing `-N` when that id is already taken.
pub fn unique_id<Tz: TimeZone>(at: &DateTime<Tz>, existing: &Snapshot) -> TaskId {
    let base = compose_id(at);
    if !existing.contains(&base) {
        return base;
    }

    let mut n = 1u32;
    loop {
        let candidate = TaskId::new(format!("{base}-{n}"));
        if !existing.contains(&candidate) {
            tracing::debug!(base = %base, id = %candidate, "timestamp id collided; suffixed");
            return candidate;
        }
        n += 1;
    }
}

pub fn next_id(existing: &Snapshot) -> TaskId {
    unique_id(&Local::now(), existing)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{compose_id, unique_id};
    use crate::store::Snapshot;
    use crate::task::{Task, TaskId};

    fn at(ms: u32) -> chrono::DateTime<Utc> {
        let naive = NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(|d| d.and_hms_milli_opt(9, 5, 3, ms))
            .expect("valid timestamp");
        Utc.from_utc_datetime(&naive)
    }

    #[test]
    fn composes_unpadded_fields() {
        assert_eq!(compose_id(&at(42)), TaskId::from("12691995342"));
        assert_eq!(compose_id(&at(0)).as_str(), "1269199530");
    }

    #[test]
    fn suffixes_on_collision() {
        let base = compose_id(&at(7));
        let mut existing = Snapshot::default();
        existing.active.push(Task::new("a", base.clone()));
        existing
            .trash
            .push(Task::new("b", TaskId::new(format!("{base}-1"))));

        let id = unique_id(&at(7), &existing);
        assert_eq!(id, TaskId::new(format!("{base}-2")));
        assert_eq!(unique_id(&at(8), &existing), compose_id(&at(8)));
    }
}
