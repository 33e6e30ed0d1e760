use crate::{
    api::{now_local, qr::fetch_latest_qr},
    auth::auth::AuthUser,
    db::is_duplicate_key,
    error::ApiError,
    model::attendance::{AttendanceRecord, DAY_KEY_FORMAT},
    utils::csv_export::{csv_attachment, to_csv},
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const ATTENDANCE_COLUMNS: &str = "id, user_id, user_email, date, marked_at, qr_id, meal_type";

#[derive(Deserialize, ToSchema)]
pub struct MarkAttendance {
    /// Decoded content of the scanned QR code
    #[schema(example = "meal-attendance-2026-01-01-1767225600000")]
    pub qr_value: String,
}

#[derive(Deserialize, IntoParams)]
pub struct AttendanceQuery {
    /// Admin only: restrict to one member
    pub user_id: Option<u64>,
}

pub(crate) async fn fetch_user_attendance(
    pool: &MySqlPool,
    user_id: u64,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = ? \
         ORDER BY marked_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn fetch_all_attendance(
    pool: &MySqlPool,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance ORDER BY marked_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await
}

/// Mark today's attendance with the scanned QR code
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkAttendance,
    responses(
        (status = 201, description = "Attendance marked", body = Object, example = json!({
            "message": "Attendance marked",
            "date": "2026-01-01",
            "meal_type": "general"
        })),
        (status = 400, description = "Invalid QR code or already attended today", body = Object, example = json!({
            "message": "Already attended today"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<MarkAttendance>,
) -> Result<HttpResponse, ApiError> {
    if payload.qr_value.trim().is_empty() {
        return Err(ApiError::bad_request("qr_value is required"));
    }

    let now = now_local();
    let today = now.date();

    let qr = fetch_latest_qr(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::bad_request("No QR code has been generated yet"))?;

    qr.check_scan(&payload.qr_value, today)
        .map_err(|rejection| ApiError::bad_request(rejection.to_string()))?;

    let day_key = today.format(DAY_KEY_FORMAT).to_string();

    let result = sqlx::query(
        r#"
        INSERT INTO attendance (user_id, user_email, date, marked_at, qr_id, meal_type)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(&auth.email)
    .bind(&day_key)
    .bind(now)
    .bind(qr.id)
    .bind(&qr.meal_type)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(json!({
            "message": "Attendance marked",
            "date": day_key,
            "meal_type": qr.meal_type
        }))),
        // one row per member per day
        Err(e) if is_duplicate_key(&e) => Err(ApiError::bad_request("Already attended today")),
        Err(e) => {
            tracing::error!(error = %e, user_id = auth.user_id, "Mark attendance failed");
            Err(ApiError::Internal)
        }
    }
}

/// Whether the caller already attended today
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's status", body = Object, example = json!({
            "date": "2026-01-01",
            "attended": true
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let day_key = now_local().date().format(DAY_KEY_FORMAT).to_string();

    let attended = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendance WHERE user_id = ? AND date = ?",
    )
    .bind(auth.user_id)
    .bind(&day_key)
    .fetch_one(pool.get_ref())
    .await?
        > 0;

    Ok(HttpResponse::Ok().json(json!({ "date": day_key, "attended": attended })))
}

/// Attendance history, newest first
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Attendance records", body = [AttendanceRecord]),
        (status = 403, description = "Member asked for someone else's records")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, ApiError> {
    let records = if auth.is_admin && query.user_id.is_none() {
        fetch_all_attendance(pool.get_ref()).await?
    } else {
        let user_id = auth.resolve_target(query.user_id)?;
        fetch_user_attendance(pool.get_ref(), user_id).await?
    };

    Ok(HttpResponse::Ok().json(records))
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AttendanceCsvRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "MealType")]
    pub meal_type: String,
}

impl From<&AttendanceRecord> for AttendanceCsvRow {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            date: record
                .event_date()
                .map(|d| d.format(DAY_KEY_FORMAT).to_string())
                .unwrap_or_default(),
            time: record
                .marked_at
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_default(),
            email: record.user_email.clone(),
            meal_type: if record.meal_type.is_empty() {
                "general".to_string()
            } else {
                record.meal_type.clone()
            },
        }
    }
}

/// Download all attendance as CSV (admin)
#[utoipa::path(
    get,
    path = "/api/attendance/export",
    responses(
        (status = 200, description = "CSV file", body = String, content_type = "text/csv"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No attendance data to export")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn export_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let records = fetch_all_attendance(pool.get_ref()).await?;
    if records.is_empty() {
        return Err(ApiError::not_found("No attendance data to export"));
    }

    let rows: Vec<AttendanceCsvRow> = records.iter().map(AttendanceCsvRow::from).collect();
    let body = to_csv(&rows)?;
    let filename = format!(
        "attendance-data-{}.csv",
        now_local().date().format(DAY_KEY_FORMAT)
    );

    Ok(csv_attachment(&filename, body))
}
