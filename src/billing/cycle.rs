use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;

pub const CYCLE_LENGTH_DAYS: i64 = 30;

/// The 30-day window `today` falls in, counted from the anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct BillingCycle {
    /// Earliest attendance date of the member
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub anchor_date: NaiveDate,
    /// Number of whole cycles elapsed since the anchor, never negative
    #[schema(example = 1)]
    pub cycle_index: i64,
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    pub window_start: NaiveDate,
    /// Exclusive
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub window_end: NaiveDate,
}

impl BillingCycle {
    /// A `today` before the anchor is treated as the anchor day itself.
    pub fn for_anchor(anchor_date: NaiveDate, today: NaiveDate) -> Self {
        let days_since_anchor = (today - anchor_date).num_days().max(0);
        let cycle_index = days_since_anchor / CYCLE_LENGTH_DAYS;
        let window_start = anchor_date + Duration::days(cycle_index * CYCLE_LENGTH_DAYS);

        Self {
            anchor_date,
            cycle_index,
            window_start,
            window_end: window_start + Duration::days(CYCLE_LENGTH_DAYS),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.window_start <= date && date < self.window_end
    }
}

/// Attendance falling inside the current cycle.
///
/// `cycle` is `None` when there is nothing to anchor on yet, in which case
/// `records` is empty too.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleAttendance<'a> {
    pub cycle: Option<BillingCycle>,
    pub records: Vec<&'a AttendanceRecord>,
}

impl CycleAttendance<'_> {
    pub fn empty() -> Self {
        Self {
            cycle: None,
            records: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }
}

/// Earliest usable event date; records without one are ignored.
pub fn anchor_date(records: &[AttendanceRecord]) -> Option<NaiveDate> {
    records.iter().filter_map(AttendanceRecord::event_date).min()
}

pub fn compute_current_cycle_attendance(
    records: &[AttendanceRecord],
    now: NaiveDateTime,
) -> CycleAttendance<'_> {
    match anchor_date(records) {
        Some(anchor) => attendance_in_cycle(records, BillingCycle::for_anchor(anchor, now.date())),
        None => CycleAttendance::empty(),
    }
}

/// Keeps the records whose event date lies in `cycle`, in input order.
pub fn attendance_in_cycle(records: &[AttendanceRecord], cycle: BillingCycle) -> CycleAttendance<'_> {
    let records = records
        .iter()
        .filter(|r| r.event_date().is_some_and(|d| cycle.contains(d)))
        .collect();

    CycleAttendance {
        cycle: Some(cycle),
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
        date.and_hms_opt(hour, 0, 0).unwrap()
    }

    fn record(id: u64, date: &str) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id: 7,
            user_email: "asha@hostel.in".into(),
            date: Some(date.to_string()),
            marked_at: None,
            qr_id: None,
            meal_type: "general".into(),
        }
    }

    #[test]
    fn first_day_opens_cycle_zero() {
        let records = vec![record(1, "2024-01-01")];
        let result = compute_current_cycle_attendance(&records, at(day(2024, 1, 1), 9));

        let cycle = result.cycle.unwrap();
        assert_eq!(cycle.anchor_date, day(2024, 1, 1));
        assert_eq!(cycle.cycle_index, 0);
        assert_eq!(cycle.window_start, day(2024, 1, 1));
        assert_eq!(cycle.window_end, day(2024, 1, 31));
        assert_eq!(result.records, vec![&records[0]]);
    }

    #[test]
    fn second_cycle_drops_first_cycle_records() {
        let records = vec![record(1, "2024-01-01"), record(2, "2024-02-05")];
        let result = compute_current_cycle_attendance(&records, at(day(2024, 2, 5), 20));

        let cycle = result.cycle.unwrap();
        assert_eq!(cycle.cycle_index, 1);
        assert_eq!(cycle.window_start, day(2024, 1, 31));
        assert_eq!(cycle.window_end, day(2024, 3, 1));
        assert_eq!(result.records, vec![&records[1]]);
    }

    #[test]
    fn empty_input_has_no_cycle() {
        for now in [at(day(2024, 1, 1), 0), at(day(1999, 12, 31), 23)] {
            let result = compute_current_cycle_attendance(&[], now);
            assert_eq!(result, CycleAttendance::empty());
            assert_eq!(result.count(), 0);
        }
    }

    #[test]
    fn only_malformed_records_behaves_like_empty() {
        let mut broken = record(1, "not-a-date");
        broken.marked_at = None;
        let records = vec![broken];
        let result = compute_current_cycle_attendance(&records, at(day(2024, 1, 1), 0));
        assert_eq!(result, CycleAttendance::empty());
    }

    #[test]
    fn malformed_records_neither_anchor_nor_count() {
        let records = vec![
            record(1, "2023-12-01"),
            record(2, "garbage"),
            record(3, "2024-01-10"),
        ];
        let result = compute_current_cycle_attendance(&records, at(day(2024, 1, 10), 12));
        let cycle = result.cycle.unwrap();
        assert_eq!(cycle.anchor_date, day(2023, 12, 1));
        assert_eq!(cycle.window_start, day(2023, 12, 31));
        assert_eq!(result.records, vec![&records[2]]);
    }

    #[test]
    fn now_before_anchor_clamps_to_cycle_zero() {
        let records = vec![record(1, "2024-05-10")];
        let result = compute_current_cycle_attendance(&records, at(day(2024, 5, 1), 8));
        let cycle = result.cycle.unwrap();
        assert_eq!(cycle.cycle_index, 0);
        assert_eq!(cycle.window_start, day(2024, 5, 10));
        assert_eq!(cycle.window_end, day(2024, 6, 9));
        assert_eq!(result.count(), 1);
    }

    #[test]
    fn rollover_happens_on_day_thirty() {
        let records = vec![record(1, "2024-01-01")];
        let last = compute_current_cycle_attendance(&records, at(day(2024, 1, 30), 23));
        assert_eq!(last.cycle.unwrap().cycle_index, 0);
        assert_eq!(last.count(), 1);

        let next = compute_current_cycle_attendance(&records, at(day(2024, 1, 31), 0));
        assert_eq!(next.cycle.unwrap().cycle_index, 1);
        assert_eq!(next.count(), 0);
    }

    #[test]
    fn time_of_day_does_not_matter() {
        let records = vec![record(1, "2024-01-01")];
        let morning = compute_current_cycle_attendance(&records, at(day(2024, 3, 1), 0));
        let night = compute_current_cycle_attendance(&records, at(day(2024, 3, 1), 23));
        assert_eq!(morning, night);
    }

    #[test]
    fn timestamp_fallback_dates_are_used() {
        let mut r = record(1, "");
        r.date = None;
        r.marked_at = Some(at(day(2024, 2, 2), 13));
        let records = vec![r];
        let result = compute_current_cycle_attendance(&records, at(day(2024, 2, 3), 9));
        assert_eq!(result.cycle.unwrap().anchor_date, day(2024, 2, 2));
        assert_eq!(result.count(), 1);
    }

    #[test]
    fn window_always_contains_today_and_only_in_window_records() {
        let anchor = day(2023, 11, 17);
        let records: Vec<_> = (0..200)
            .step_by(3)
            .map(|offset| {
                let d = anchor + Duration::days(offset);
                record(offset as u64, &d.format("%Y-%m-%d").to_string())
            })
            .collect();

        for offset in 0..400 {
            let today = anchor + Duration::days(offset);
            let result = compute_current_cycle_attendance(&records, at(today, 10));
            let cycle = result.cycle.unwrap();

            assert!(cycle.window_start <= today && today < cycle.window_end);
            assert_eq!((cycle.window_end - cycle.window_start).num_days(), CYCLE_LENGTH_DAYS);
            for r in &result.records {
                assert!(cycle.contains(r.event_date().unwrap()));
            }
            let expected = records
                .iter()
                .filter(|r| cycle.contains(r.event_date().unwrap()))
                .count();
            assert_eq!(result.count(), expected);
        }
    }

    #[test]
    fn repeated_calls_agree() {
        let records = vec![record(1, "2024-01-03"), record(2, "2024-02-14")];
        let now = at(day(2024, 2, 20), 18);
        assert_eq!(
            compute_current_cycle_attendance(&records, now),
            compute_current_cycle_attendance(&records, now)
        );
    }

    #[test]
    fn later_records_never_move_the_anchor() {
        let mut records = vec![record(1, "2024-01-05"), record(2, "2024-01-09")];
        let now = at(day(2024, 3, 1), 12);
        let before = compute_current_cycle_attendance(&records, now).cycle.unwrap();

        records.push(record(3, "2024-02-20"));
        let after = compute_current_cycle_attendance(&records, now).cycle.unwrap();
        assert_eq!(before.anchor_date, after.anchor_date);

        records.push(record(4, "2024-01-02"));
        let earlier = compute_current_cycle_attendance(&records, now).cycle.unwrap();
        assert_eq!(earlier.anchor_date, day(2024, 1, 2));
    }

    #[test]
    fn unordered_input_finds_the_earliest_anchor() {
        let records = vec![
            record(1, "2024-02-01"),
            record(2, "2024-01-15"),
            record(3, "2024-01-20"),
        ];
        assert_eq!(anchor_date(&records), Some(day(2024, 1, 15)));
    }

    #[test]
    fn same_day_duplicates_are_all_counted() {
        let records = vec![record(1, "2024-01-02"), record(2, "2024-01-02")];
        let result = compute_current_cycle_attendance(&records, at(day(2024, 1, 2), 12));
        assert_eq!(result.count(), 2);
    }
}
