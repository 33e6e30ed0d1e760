use crate::{
    api::{month_label, notification::notify_best_effort, now_local},
    auth::auth::AuthUser,
    config::Config,
    error::ApiError,
    model::{
        notification::{NewNotification, NotificationKind},
        payment::{Payment, PaymentMethod, PaymentStatus},
    },
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

const PAYMENT_COLUMNS: &str = "id, user_id, user_email, amount, currency, transaction_id, \
     payment_method, status, month, created_at, verified_at, verified_by";

#[derive(Deserialize, ToSchema)]
pub struct SubmitPayment {
    /// UPI transaction reference shown by the payer's app
    #[schema(example = "UPI123456789")]
    pub transaction_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct OfflinePayment {
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = 3000.0)]
    pub amount: f64,
}

#[derive(Serialize, ToSchema)]
pub struct PaymentStatusResponse {
    #[schema(example = "January 2026")]
    pub month: String,
    #[schema(example = "pending", nullable = true)]
    pub status: Option<PaymentStatus>,
}

/// Status of the member's latest payment for `month`, if any.
pub(crate) async fn current_payment_status(
    pool: &MySqlPool,
    user_id: u64,
    month: &str,
) -> Result<Option<PaymentStatus>, sqlx::Error> {
    let status = sqlx::query_scalar::<_, String>(
        r#"
        SELECT status FROM payments
        WHERE user_id = ? AND month = ?
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(month)
    .fetch_optional(pool)
    .await?;

    Ok(status.and_then(|s| s.parse().ok()))
}

pub(crate) async fn fetch_all_payments(pool: &MySqlPool) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await
}

async fn fetch_payment(pool: &MySqlPool, payment_id: u64) -> Result<Payment, ApiError> {
    sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?"
    ))
    .bind(payment_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Payment not found"))
}

async fn user_email(pool: &MySqlPool, user_id: u64) -> Result<String, ApiError> {
    sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// Submit this month's UPI payment for verification
#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = SubmitPayment,
    responses(
        (status = 201, description = "Payment submitted", body = Object, example = json!({
            "message": "Payment submitted for verification",
            "status": "pending",
            "month": "January 2026",
            "amount": 3000.0
        })),
        (status = 400, description = "Missing transaction id"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn submit_payment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<SubmitPayment>,
) -> Result<HttpResponse, ApiError> {
    let transaction_id = payload.transaction_id.trim();
    if transaction_id.is_empty() {
        return Err(ApiError::bad_request("transaction_id is required"));
    }

    let now = now_local();
    let month = month_label(now);

    let result = sqlx::query(
        r#"
        INSERT INTO payments
            (user_id, user_email, amount, currency, transaction_id, payment_method, status, month,
             created_at)
        VALUES (?, ?, ?, 'INR', ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(&auth.email)
    .bind(config.monthly_fee)
    .bind(transaction_id)
    .bind(PaymentMethod::Upi.as_ref())
    .bind(PaymentStatus::Pending.as_ref())
    .bind(&month)
    .bind(now)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to record payment");
        ApiError::Internal
    })?;

    tracing::info!(user_id = auth.user_id, %month, "Payment submitted");

    Ok(HttpResponse::Created().json(json!({
        "message": "Payment submitted for verification",
        "id": result.last_insert_id(),
        "status": PaymentStatus::Pending,
        "month": month,
        "amount": config.monthly_fee
    })))
}

/// Record a cash payment collected at the mess (admin)
#[utoipa::path(
    post,
    path = "/api/payments/offline",
    request_body = OfflinePayment,
    responses(
        (status = 201, description = "Offline payment recorded"),
        (status = 400, description = "Invalid amount"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn record_offline_payment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<OfflinePayment>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    if !(payload.amount.is_finite() && payload.amount > 0.0) {
        return Err(ApiError::bad_request("amount must be greater than zero"));
    }

    let email = user_email(pool.get_ref(), payload.user_id).await?;
    let now = now_local();
    let month = month_label(now);

    let result = sqlx::query(
        r#"
        INSERT INTO payments
            (user_id, user_email, amount, currency, payment_method, status, month,
             created_at, verified_at, verified_by)
        VALUES (?, ?, ?, 'INR', ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.user_id)
    .bind(&email)
    .bind(payload.amount)
    .bind(PaymentMethod::Offline.as_ref())
    .bind(PaymentStatus::Verified.as_ref())
    .bind(&month)
    .bind(now)
    .bind(now)
    .bind(&auth.email)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(user_id = payload.user_id, amount = payload.amount, by = %auth.email, "Offline payment recorded");

    Ok(HttpResponse::Created().json(json!({
        "message": "Offline payment recorded",
        "id": result.last_insert_id(),
        "status": PaymentStatus::Verified,
        "month": month
    })))
}

async fn settle_payment(
    auth: &AuthUser,
    pool: &MySqlPool,
    payment_id: u64,
    decision: PaymentStatus,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let payment = fetch_payment(pool, payment_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE payments
        SET status = ?, verified_at = ?, verified_by = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(decision.as_ref())
    .bind(now_local())
    .bind(&auth.email)
    .bind(payment_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request("Payment already processed"));
    }

    let (kind, title) = match decision {
        PaymentStatus::Verified => (NotificationKind::PaymentVerified, "Payment verified"),
        _ => (NotificationKind::PaymentRejected, "Payment rejected"),
    };
    let message = format!(
        "Your payment of {:.2} {} for {} was {}.",
        payment.amount, payment.currency, payment.month, decision
    );
    notify_best_effort(pool, NewNotification::new(payment.user_id, kind, title, message)).await;

    tracing::info!(payment_id, status = %decision, by = %auth.email, "Payment settled");

    Ok(HttpResponse::Ok().json(json!({ "message": title })))
}

#[utoipa::path(
    put,
    path = "/api/payments/{payment_id}/verify",
    params(("payment_id" = u64, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment verified"),
        (status = 400, description = "Already processed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Payment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn verify_payment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    settle_payment(&auth, pool.get_ref(), path.into_inner(), PaymentStatus::Verified).await
}

#[utoipa::path(
    put,
    path = "/api/payments/{payment_id}/reject",
    params(("payment_id" = u64, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment rejected"),
        (status = 400, description = "Already processed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Payment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn reject_payment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    settle_payment(&auth, pool.get_ref(), path.into_inner(), PaymentStatus::Rejected).await
}

/// Payments; members see their own, admins see all
#[utoipa::path(
    get,
    path = "/api/payments",
    responses(
        (status = 200, description = "Payments, newest first", body = [Payment]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_payments(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let payments = if auth.is_admin {
        fetch_all_payments(pool.get_ref()).await?
    } else {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(auth.user_id)
        .fetch_all(pool.get_ref())
        .await?
    };

    Ok(HttpResponse::Ok().json(payments))
}

/// The caller's payment status for the current month
#[utoipa::path(
    get,
    path = "/api/payments/status",
    responses(
        (status = 200, description = "Status of the latest payment this month", body = PaymentStatusResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn payment_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let month = month_label(now_local());
    let status = current_payment_status(pool.get_ref(), auth.user_id, &month).await?;

    Ok(HttpResponse::Ok().json(PaymentStatusResponse { month, status }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_response_serializes_missing_status_as_null() {
        let body = serde_json::to_value(PaymentStatusResponse {
            month: "January 2026".into(),
            status: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "month": "January 2026", "status": null }));

        let body = serde_json::to_value(PaymentStatusResponse {
            month: "January 2026".into(),
            status: Some(PaymentStatus::Verified),
        })
        .unwrap();
        assert_eq!(body["status"], "verified");
    }
}
