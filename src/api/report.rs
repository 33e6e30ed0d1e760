use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
    api::{
        attendance::fetch_all_attendance, leave_request::fetch_all_leaves, month_label,
        now_local, payment::fetch_all_payments,
    },
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        attendance::{AttendanceRecord, DAY_KEY_FORMAT},
        leave_request::{LeaveRequest, LeaveStatus},
        payment::Payment,
    },
    utils::csv_export::{csv_attachment, to_csv},
};
use actix_web::{HttpResponse, web};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const TOP_ATTENDEES: usize = 10;

#[derive(Deserialize, IntoParams)]
pub struct ReportQuery {
    /// `YYYY-MM`; defaults to the current month
    #[param(example = "2026-01")]
    pub month: Option<String>,
}

/// First day of a `YYYY-MM` month.
pub fn parse_month(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), DAY_KEY_FORMAT).ok()
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

fn in_month(at: Option<NaiveDateTime>, month: NaiveDate) -> bool {
    at.is_some_and(|at| same_month(at.date(), month))
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct DailyCount {
    #[schema(example = "2026-01-05")]
    pub date: String,
    #[schema(example = 41)]
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct TopAttendee {
    #[schema(example = "asha@hostel.in")]
    pub email: String,
    #[schema(example = 27)]
    pub meals: usize,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct MonthlyReport {
    #[schema(example = "2026-01")]
    pub month: String,
    #[schema(example = "January 2026")]
    pub month_label: String,
    pub total_attendance: usize,
    pub unique_attendees: usize,
    /// Sum of verified payments made during the month
    pub total_revenue: f64,
    /// Approved leaves requested during the month
    pub approved_leaves: usize,
    pub average_attendance_per_user: u64,
    pub daily_breakdown: Vec<DailyCount>,
    pub top_attendees: Vec<TopAttendee>,
}

impl MonthlyReport {
    pub fn build(
        month: NaiveDate,
        attendance: &[AttendanceRecord],
        payments: &[Payment],
        leaves: &[LeaveRequest],
    ) -> Self {
        let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        let mut per_email: HashMap<&str, usize> = HashMap::new();
        let mut attendees: HashSet<u64> = HashSet::new();
        let mut total_attendance = 0;

        for (record, date) in attendance
            .iter()
            .filter_map(|r| r.event_date().map(|d| (r, d)))
            .filter(|(_, d)| same_month(*d, month))
        {
            total_attendance += 1;
            attendees.insert(record.user_id);
            *daily.entry(date).or_default() += 1;
            *per_email.entry(record.user_email.as_str()).or_default() += 1;
        }

        let total_revenue = payments
            .iter()
            .filter(|p| p.is_verified() && same_month(p.created_at.date(), month))
            .map(|p| p.amount)
            .sum();

        let approved_leaves = leaves
            .iter()
            .filter(|l| l.status() == Some(LeaveStatus::Approved))
            .filter(|l| in_month(l.requested_at, month))
            .count();

        let unique_attendees = attendees.len();
        let average_attendance_per_user = if unique_attendees > 0 {
            (total_attendance as f64 / unique_attendees as f64).round() as u64
        } else {
            0
        };

        let mut top: Vec<TopAttendee> = per_email
            .into_iter()
            .map(|(email, meals)| TopAttendee {
                email: email.to_string(),
                meals,
            })
            .collect();
        top.sort_by(|a, b| b.meals.cmp(&a.meals).then_with(|| a.email.cmp(&b.email)));
        top.truncate(TOP_ATTENDEES);

        MonthlyReport {
            month: month.format("%Y-%m").to_string(),
            month_label: month.format("%B %Y").to_string(),
            total_attendance,
            unique_attendees,
            total_revenue,
            approved_leaves,
            average_attendance_per_user,
            daily_breakdown: daily
                .into_iter()
                .map(|(date, count)| DailyCount {
                    date: date.format(DAY_KEY_FORMAT).to_string(),
                    count,
                })
                .collect(),
            top_attendees: top,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ReportCsvRow {
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Total Attendance")]
    pub total_attendance: usize,
    #[serde(rename = "Unique Attendees")]
    pub unique_attendees: usize,
    #[serde(rename = "Total Revenue")]
    pub total_revenue: f64,
    #[serde(rename = "Approved Leaves")]
    pub approved_leaves: usize,
    #[serde(rename = "Average Attendance per User")]
    pub average_attendance_per_user: u64,
    /// `date:count` pairs separated by `;`
    #[serde(rename = "Daily Breakdown")]
    pub daily_breakdown: String,
}

impl From<&MonthlyReport> for ReportCsvRow {
    fn from(r: &MonthlyReport) -> Self {
        ReportCsvRow {
            month: r.month_label.clone(),
            total_attendance: r.total_attendance,
            unique_attendees: r.unique_attendees,
            total_revenue: r.total_revenue,
            approved_leaves: r.approved_leaves,
            average_attendance_per_user: r.average_attendance_per_user,
            daily_breakdown: r
                .daily_breakdown
                .iter()
                .map(|d| format!("{}:{}", d.date, d.count))
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct DashboardStats {
    pub registered_users: i64,
    /// Members with at least one attendance record
    pub users_attended: i64,
    pub pending_feedback: i64,
    pub pending_leaves: i64,
    pub pending_payments: i64,
    pub total_revenue: f64,
    /// Verified payments whose month label is the current one
    pub monthly_revenue: f64,
    #[schema(example = "January 2026")]
    pub month: String,
}

/// `(total, current month)` revenue from verified payments.
pub fn verified_revenue(payments: &[Payment], month_label: &str) -> (f64, f64) {
    payments
        .iter()
        .filter(|p| p.is_verified())
        .fold((0.0, 0.0), |(total, monthly), p| {
            let this_month = if p.month == month_label { p.amount } else { 0.0 };
            (total + p.amount, monthly + this_month)
        })
}

async fn count(pool: &MySqlPool, sql: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await
}

async fn monthly_report(pool: &MySqlPool, query: &ReportQuery) -> Result<MonthlyReport, ApiError> {
    let month = match query.month.as_deref() {
        Some(value) => parse_month(value)
            .ok_or_else(|| ApiError::bad_request("month must be formatted as YYYY-MM"))?,
        None => now_local().date().with_day(1).unwrap_or_else(|| now_local().date()),
    };

    let attendance = fetch_all_attendance(pool).await?;
    let payments = fetch_all_payments(pool).await?;
    let leaves = fetch_all_leaves(pool).await?;

    Ok(MonthlyReport::build(month, &attendance, &payments, &leaves))
}

/// Attendance, revenue and leave figures for one month (admin)
#[utoipa::path(
    get,
    path = "/api/reports/monthly",
    params(ReportQuery),
    responses(
        (status = 200, description = "Monthly report", body = MonthlyReport),
        (status = 400, description = "Malformed month"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn get_monthly_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let report = monthly_report(pool.get_ref(), &query).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    get,
    path = "/api/reports/monthly/export",
    params(ReportQuery),
    responses(
        (status = 200, description = "CSV file", body = String, content_type = "text/csv"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn export_monthly_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let report = monthly_report(pool.get_ref(), &query).await?;

    let body = to_csv(&[ReportCsvRow::from(&report)])?;
    Ok(csv_attachment(&format!("monthly-report-{}.csv", report.month), body))
}

/// Dashboard counters (admin)
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardStats),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn admin_stats(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let pool = pool.get_ref();

    let registered_users = count(pool, "SELECT COUNT(*) FROM users").await?;
    let users_attended = count(pool, "SELECT COUNT(DISTINCT user_id) FROM attendance").await?;
    let pending_feedback =
        count(pool, "SELECT COUNT(*) FROM feedback WHERE status = 'pending'").await?;
    let pending_leaves =
        count(pool, "SELECT COUNT(*) FROM leave_requests WHERE status = 'pending'").await?;
    let pending_payments =
        count(pool, "SELECT COUNT(*) FROM payments WHERE status = 'pending'").await?;

    let payments = fetch_all_payments(pool).await?;
    let month = month_label(now_local());
    let (total_revenue, monthly_revenue) = verified_revenue(&payments, &month);

    Ok(HttpResponse::Ok().json(DashboardStats {
        registered_users,
        users_attended,
        pending_feedback,
        pending_leaves,
        pending_payments,
        total_revenue,
        monthly_revenue,
        month,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn attended(id: u64, user_id: u64, email: &str, date: &str) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id,
            user_email: email.into(),
            date: Some(date.into()),
            marked_at: None,
            qr_id: None,
            meal_type: "general".into(),
        }
    }

    fn payment(amount: f64, status: &str, month: &str, created: NaiveDate) -> Payment {
        Payment {
            id: 1,
            user_id: 7,
            user_email: "asha@hostel.in".into(),
            amount,
            currency: "INR".into(),
            transaction_id: None,
            payment_method: "UPI".into(),
            status: status.into(),
            month: month.into(),
            created_at: created.and_hms_opt(10, 0, 0).unwrap(),
            verified_at: None,
            verified_by: None,
        }
    }

    fn leave(status: &str, requested: NaiveDate) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            user_id: 7,
            user_email: "asha@hostel.in".into(),
            start_date: requested,
            end_date: requested,
            reason: "home".into(),
            meal_type: "both".into(),
            status: status.into(),
            requested_at: requested.and_hms_opt(8, 0, 0),
            responded_at: None,
            responded_by: None,
        }
    }

    #[test]
    fn parses_year_month() {
        assert_eq!(parse_month("2026-01"), Some(day(2026, 1, 1)));
        assert_eq!(parse_month("2026-13"), None);
        assert_eq!(parse_month("January"), None);
    }

    #[test]
    fn monthly_report_aggregates_the_selected_month_only() {
        let attendance = vec![
            attended(1, 7, "asha@hostel.in", "2026-01-05"),
            attended(2, 7, "asha@hostel.in", "2026-01-06"),
            attended(3, 7, "asha@hostel.in", "2026-01-07"),
            attended(4, 8, "ravi@hostel.in", "2026-01-05"),
            attended(5, 8, "ravi@hostel.in", "2026-02-01"),
            attended(6, 9, "old@hostel.in", "garbage"),
        ];
        let payments = vec![
            payment(3000.0, "verified", "January 2026", day(2026, 1, 3)),
            payment(3000.0, "paid", "January 2026", day(2026, 1, 4)),
            payment(3000.0, "pending", "January 2026", day(2026, 1, 4)),
            payment(3000.0, "verified", "February 2026", day(2026, 2, 1)),
        ];
        let leaves = vec![
            leave("approved", day(2026, 1, 10)),
            leave("rejected", day(2026, 1, 11)),
            leave("approved", day(2025, 12, 31)),
        ];

        let report = MonthlyReport::build(day(2026, 1, 1), &attendance, &payments, &leaves);

        assert_eq!(report.month, "2026-01");
        assert_eq!(report.month_label, "January 2026");
        assert_eq!(report.total_attendance, 4);
        assert_eq!(report.unique_attendees, 2);
        assert_eq!(report.total_revenue, 6000.0);
        assert_eq!(report.approved_leaves, 1);
        assert_eq!(report.average_attendance_per_user, 2);
        assert_eq!(
            report.daily_breakdown,
            vec![
                DailyCount { date: "2026-01-05".into(), count: 2 },
                DailyCount { date: "2026-01-06".into(), count: 1 },
                DailyCount { date: "2026-01-07".into(), count: 1 },
            ]
        );
        assert_eq!(report.top_attendees[0], TopAttendee { email: "asha@hostel.in".into(), meals: 3 });
        assert_eq!(report.top_attendees.len(), 2);
    }

    #[test]
    fn empty_month_has_zero_average() {
        let report = MonthlyReport::build(day(2026, 1, 1), &[], &[], &[]);
        assert_eq!(report.total_attendance, 0);
        assert_eq!(report.average_attendance_per_user, 0);
        assert!(report.daily_breakdown.is_empty());
    }

    #[test]
    fn csv_row_flattens_daily_breakdown() {
        let attendance = vec![
            attended(1, 7, "asha@hostel.in", "2026-01-05"),
            attended(2, 7, "asha@hostel.in", "2026-01-06"),
        ];
        let report = MonthlyReport::build(day(2026, 1, 1), &attendance, &[], &[]);
        let row = ReportCsvRow::from(&report);
        assert_eq!(row.month, "January 2026");
        assert_eq!(row.daily_breakdown, "2026-01-05:1;2026-01-06:1");

        let csv = String::from_utf8(to_csv(&[row]).unwrap()).unwrap();
        assert!(csv.starts_with("Month,Total Attendance,Unique Attendees,Total Revenue,"));
    }

    #[test]
    fn revenue_counts_verified_and_legacy_paid() {
        let payments = vec![
            payment(3000.0, "verified", "January 2026", day(2026, 1, 3)),
            payment(2500.0, "paid", "December 2025", day(2025, 12, 3)),
            payment(3000.0, "rejected", "January 2026", day(2026, 1, 3)),
        ];
        assert_eq!(verified_revenue(&payments, "January 2026"), (5500.0, 3000.0));
    }
}
