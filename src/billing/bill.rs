use chrono::{Datelike, NaiveDateTime};

use crate::model::{
    attendance::AttendanceRecord,
    leave_request::{LeaveRequest, LeaveStatus},
};

/// Approved leaves submitted in the calendar month of `now`.
///
/// This uses the calendar month, not the rolling attendance cycle. Leaves
/// with no submission time are skipped.
pub fn approved_leave_count(leave_records: &[LeaveRequest], now: NaiveDateTime) -> usize {
    leave_records
        .iter()
        .filter(|leave| leave.status() == Some(LeaveStatus::Approved))
        .filter(|leave| {
            leave
                .requested_at
                .is_some_and(|at| at.year() == now.year() && at.month() == now.month())
        })
        .count()
}

/// `(attended meals - approved leaves this month) * per_meal_rate`.
///
/// The result is not floored at zero. Records without a usable date do not
/// count as meals.
pub fn compute_estimated_bill(
    monthly_attendance: &[&AttendanceRecord],
    leave_records: &[LeaveRequest],
    now: NaiveDateTime,
    per_meal_rate: f64,
) -> f64 {
    let meals = monthly_attendance
        .iter()
        .filter(|r| r.event_date().is_some())
        .count() as i64;
    let leaves = approved_leave_count(leave_records, now) as i64;

    (meals - leaves) as f64 * per_meal_rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 18)
            .unwrap()
            .and_hms_opt(19, 30, 0)
            .unwrap()
    }

    fn meals(n: u64) -> Vec<AttendanceRecord> {
        (0..n)
            .map(|i| AttendanceRecord {
                id: i,
                user_id: 7,
                user_email: "asha@hostel.in".into(),
                date: Some(format!("2024-03-{:02}", i % 28 + 1)),
                marked_at: None,
                qr_id: None,
                meal_type: "general".into(),
            })
            .collect()
    }

    fn leave(status: &str, requested: Option<(i32, u32, u32)>) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            user_id: 7,
            user_email: "asha@hostel.in".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 22).unwrap(),
            reason: "exam".into(),
            meal_type: "both".into(),
            status: status.into(),
            requested_at: requested.map(|(y, m, d)| {
                NaiveDate::from_ymd_opt(y, m, d)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap()
            }),
            responded_at: None,
            responded_by: None,
        }
    }

    fn refs(records: &[AttendanceRecord]) -> Vec<&AttendanceRecord> {
        records.iter().collect()
    }

    #[test]
    fn one_leave_nets_one_meal() {
        let records = meals(20);
        let leaves = vec![leave("approved", Some((2024, 3, 2)))];
        assert_eq!(compute_estimated_bill(&refs(&records), &leaves, now(), 80.0), 1520.0);
    }

    #[test]
    fn leaves_can_cancel_every_meal() {
        let records = meals(2);
        let mut leaves = vec![
            leave("approved", Some((2024, 3, 1))),
            leave("approved", Some((2024, 3, 10))),
        ];
        assert_eq!(compute_estimated_bill(&refs(&records), &leaves, now(), 80.0), 0.0);

        leaves.push(leave("approved", Some((2024, 3, 11))));
        assert_eq!(compute_estimated_bill(&refs(&records), &leaves, now(), 80.0), -80.0);
    }

    #[test]
    fn only_approved_leaves_count() {
        let leaves = vec![
            leave("pending", Some((2024, 3, 1))),
            leave("rejected", Some((2024, 3, 1))),
            leave("APPROVED?", Some((2024, 3, 1))),
            leave("approved", Some((2024, 3, 1))),
        ];
        assert_eq!(approved_leave_count(&leaves, now()), 1);
    }

    #[test]
    fn leaves_from_other_months_are_ignored() {
        let leaves = vec![
            leave("approved", Some((2024, 2, 29))),
            leave("approved", Some((2023, 3, 18))),
            leave("approved", Some((2024, 4, 1))),
            leave("approved", None),
        ];
        assert_eq!(approved_leave_count(&leaves, now()), 0);

        let records = meals(3);
        assert_eq!(compute_estimated_bill(&refs(&records), &leaves, now(), 80.0), 240.0);
    }

    #[test]
    fn leave_range_is_irrelevant_only_submission_time_counts() {
        // Covers February but was requested in March.
        let mut l = leave("approved", Some((2024, 3, 1)));
        l.start_date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        l.end_date = NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
        assert_eq!(approved_leave_count(&[l], now()), 1);
    }

    #[test]
    fn undated_meals_are_not_billed() {
        let mut records = meals(3);
        records[1].date = Some("??".into());
        assert_eq!(compute_estimated_bill(&refs(&records), &[], now(), 50.0), 100.0);
    }

    #[test]
    fn no_meals_no_leaves_no_bill() {
        assert_eq!(compute_estimated_bill(&[], &[], now(), 80.0), 0.0);
    }
}
