use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::{
    api::{
        attendance::fetch_user_attendance, leave_request::fetch_user_leaves, month_label,
        now_local, payment::current_payment_status,
    },
    auth::auth::AuthUser,
    billing::{
        BillingCycle, anchor_cache, approved_leave_count, compute_current_cycle_attendance,
        compute_estimated_bill,
        cycle::{anchor_date, attendance_in_cycle},
    },
    config::Config,
    error::ApiError,
    model::{attendance::AttendanceRecord, leave_request::LeaveRequest, payment::PaymentStatus},
};

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct BillingSummary {
    #[schema(example = 7)]
    pub user_id: u64,
    /// Absent until the member has attended at least once
    pub cycle: Option<BillingCycle>,
    #[schema(example = 20)]
    pub cycle_attendance: usize,
    /// Approved leaves requested in the current calendar month
    #[schema(example = 1)]
    pub approved_leaves: usize,
    #[schema(example = 80.0)]
    pub per_meal_rate: f64,
    /// May be negative; clients decide whether to show it floored at zero
    #[schema(example = 1520.0)]
    pub estimated_bill: f64,
    #[schema(example = "January 2026")]
    pub month: String,
    #[schema(example = "pending", nullable = true)]
    pub payment_status: Option<PaymentStatus>,
}

/// Builds the summary from a snapshot. A `stable_anchor` earlier than the
/// snapshot's own anchor wins, so a partial snapshot cannot move the cycle.
pub fn summarize(
    user_id: u64,
    records: &[AttendanceRecord],
    leaves: &[LeaveRequest],
    stable_anchor: Option<NaiveDate>,
    now: NaiveDateTime,
    per_meal_rate: f64,
) -> BillingSummary {
    let mut attendance = compute_current_cycle_attendance(records, now);
    if let (Some(anchor), Some(cycle)) = (stable_anchor, attendance.cycle) {
        if anchor < cycle.anchor_date {
            attendance = attendance_in_cycle(records, BillingCycle::for_anchor(anchor, now.date()));
        }
    }

    BillingSummary {
        user_id,
        cycle: attendance.cycle,
        cycle_attendance: attendance.count(),
        approved_leaves: approved_leave_count(leaves, now),
        per_meal_rate,
        estimated_bill: compute_estimated_bill(&attendance.records, leaves, now, per_meal_rate),
        month: month_label(now),
        payment_status: None,
    }
}

async fn billing_summary_for(
    user_id: u64,
    pool: &MySqlPool,
    config: &Config,
) -> Result<BillingSummary, ApiError> {
    let now = now_local();
    let records = fetch_user_attendance(pool, user_id).await?;
    let leaves = fetch_user_leaves(pool, user_id).await?;

    let anchor = match anchor_date(&records) {
        Some(observed) => Some(anchor_cache::stabilize(user_id, observed).await),
        None => None,
    };

    let mut summary = summarize(user_id, &records, &leaves, anchor, now, config.meal_rate);
    summary.payment_status = current_payment_status(pool, user_id, &summary.month).await?;

    tracing::debug!(
        user_id,
        cycle_attendance = summary.cycle_attendance,
        estimated_bill = summary.estimated_bill,
        "Billing summary computed"
    );

    Ok(summary)
}

/// Current billing cycle and estimated bill of the caller
#[utoipa::path(
    get,
    path = "/api/billing/summary",
    responses(
        (status = 200, description = "Billing summary", body = BillingSummary),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Billing"
)]
pub async fn my_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let summary = billing_summary_for(auth.user_id, pool.get_ref(), config.get_ref()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Billing summary of any member (admin)
#[utoipa::path(
    get,
    path = "/api/billing/summary/{user_id}",
    params(("user_id" = u64, Path, description = "Member id")),
    responses(
        (status = 200, description = "Billing summary", body = BillingSummary),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Billing"
)]
pub async fn member_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let user_id = auth.resolve_target(Some(path.into_inner()))?;
    let summary = billing_summary_for(user_id, pool.get_ref(), config.get_ref()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(id: u64, date: &str) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id: 7,
            user_email: "asha@hostel.in".into(),
            date: Some(date.into()),
            marked_at: None,
            qr_id: None,
            meal_type: "general".into(),
        }
    }

    fn approved_leave(requested: NaiveDateTime) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            user_id: 7,
            user_email: "asha@hostel.in".into(),
            start_date: requested.date(),
            end_date: requested.date(),
            reason: "home".into(),
            meal_type: "both".into(),
            status: "approved".into(),
            requested_at: Some(requested),
            responded_at: None,
            responded_by: None,
        }
    }

    #[test]
    fn no_attendance_means_no_cycle_and_no_bill() {
        let now = day(2026, 1, 10).and_hms_opt(9, 0, 0).unwrap();
        let summary = summarize(7, &[], &[], None, now, 80.0);
        assert_eq!(summary.cycle, None);
        assert_eq!(summary.cycle_attendance, 0);
        assert_eq!(summary.estimated_bill, 0.0);
        assert_eq!(summary.month, "January 2026");
    }

    #[test]
    fn bill_nets_out_this_months_approved_leave() {
        let now = day(2024, 2, 5).and_hms_opt(20, 0, 0).unwrap();
        let records = vec![
            record(1, "2024-01-01"),
            record(2, "2024-02-01"),
            record(3, "2024-02-05"),
        ];
        let leaves = vec![approved_leave(day(2024, 2, 2).and_hms_opt(8, 0, 0).unwrap())];

        let summary = summarize(7, &records, &leaves, anchor_date(&records), now, 80.0);
        assert_eq!(summary.cycle.unwrap().window_start, day(2024, 1, 31));
        assert_eq!(summary.cycle_attendance, 2);
        assert_eq!(summary.approved_leaves, 1);
        assert_eq!(summary.estimated_bill, 80.0);
    }

    #[test]
    fn stabilized_anchor_overrides_the_snapshot() {
        let now = day(2024, 2, 5).and_hms_opt(20, 0, 0).unwrap();
        // Snapshot is missing the member's first day (2024-01-01).
        let records = vec![record(2, "2024-02-01"), record(3, "2024-02-05")];

        let summary = summarize(7, &records, &[], Some(day(2024, 1, 1)), now, 80.0);
        let cycle = summary.cycle.unwrap();
        assert_eq!(cycle.anchor_date, day(2024, 1, 1));
        assert_eq!(cycle.window_start, day(2024, 1, 31));
        assert_eq!(summary.cycle_attendance, 2);
    }
}
