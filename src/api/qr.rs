use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::{
    api::now_local,
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        attendance::MealType,
        daily_qr::{DailyQr, qr_value_for},
    },
};

#[derive(Deserialize, ToSchema, Default)]
pub struct GenerateQr {
    #[schema(example = "general")]
    pub meal_type: Option<MealType>,
}

pub(crate) async fn fetch_latest_qr(pool: &MySqlPool) -> Result<Option<DailyQr>, sqlx::Error> {
    sqlx::query_as::<_, DailyQr>(
        r#"
        SELECT id, date, qr_value, meal_type, created_by, created_at
        FROM daily_qr
        ORDER BY date DESC, id DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
}

/// Generate today's attendance QR code (admin)
#[utoipa::path(
    post,
    path = "/api/qr",
    request_body = GenerateQr,
    responses(
        (status = 201, description = "QR code generated", body = DailyQr),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn generate_qr(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: Option<web::Json<GenerateQr>>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let now = now_local();
    let today = now.date();
    let meal_type = payload
        .and_then(|p| p.into_inner().meal_type)
        .unwrap_or_default();
    let qr_value = qr_value_for(today, Utc::now().timestamp_millis());

    let result = sqlx::query(
        r#"
        INSERT INTO daily_qr (date, qr_value, meal_type, created_by, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(today)
    .bind(&qr_value)
    .bind(meal_type.as_ref())
    .bind(&auth.email)
    .bind(now)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(qr_id = result.last_insert_id(), %today, "Daily QR generated");

    Ok(HttpResponse::Created().json(DailyQr {
        id: result.last_insert_id(),
        date: today,
        qr_value,
        meal_type: meal_type.to_string(),
        created_by: auth.email,
        created_at: now,
    }))
}

/// Latest generated QR code
#[utoipa::path(
    get,
    path = "/api/qr/today",
    responses(
        (status = 200, description = "Newest QR code", body = DailyQr),
        (status = 404, description = "No QR code generated yet")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn latest_qr(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    match fetch_latest_qr(pool.get_ref()).await? {
        Some(qr) => Ok(HttpResponse::Ok().json(qr)),
        None => Err(ApiError::not_found("No QR code generated yet")),
    }
}
