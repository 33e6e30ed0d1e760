use crate::{
    api::now_local,
    auth::auth::AuthUser,
    error::ApiError,
    model::notification::{NewNotification, Notification, NotificationKind},
    models::normalize_email,
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, priority, is_read, created_at";

/// Writes one notification.
pub(crate) async fn notify(pool: &MySqlPool, note: &NewNotification) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notifications (user_id, kind, title, message, priority, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(note.user_id)
    .bind(note.kind.as_ref())
    .bind(&note.title)
    .bind(&note.message)
    .bind(note.priority.as_ref())
    .bind(now_local())
    .execute(pool)
    .await?;

    Ok(())
}

/// Writes a batch of notifications in one transaction; returns how many.
pub(crate) async fn notify_many(
    pool: &MySqlPool,
    notes: &[NewNotification],
) -> Result<usize, sqlx::Error> {
    if notes.is_empty() {
        return Ok(0);
    }

    let now = now_local();
    let mut tx = pool.begin().await?;
    for note in notes {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, title, message, priority, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(note.user_id)
        .bind(note.kind.as_ref())
        .bind(&note.title)
        .bind(&note.message)
        .bind(note.priority.as_ref())
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(notes.len())
}

/// Side-effect notification of a state change that already committed.
/// A failure is logged and does not undo the change.
pub(crate) async fn notify_best_effort(pool: &MySqlPool, note: NewNotification) {
    if let Err(e) = notify(pool, &note).await {
        tracing::warn!(error = %e, user_id = note.user_id, kind = %note.kind, "Notification not delivered");
    }
}

pub(crate) async fn active_user_ids(pool: &MySqlPool) -> Result<Vec<u64>, sqlx::Error> {
    sqlx::query_scalar::<_, u64>("SELECT id FROM users WHERE is_active = TRUE ORDER BY id")
        .fetch_all(pool)
        .await
}

#[derive(Deserialize, ToSchema)]
pub struct SendNotification {
    /// `all` or a member's email
    #[schema(example = "all")]
    pub recipient: String,
    #[schema(example = "Mess closed tomorrow")]
    pub title: String,
    #[schema(example = "The kitchen is being cleaned.")]
    pub message: String,
    #[serde(default = "default_kind")]
    #[schema(example = "general")]
    pub kind: NotificationKind,
}

fn default_kind() -> NotificationKind {
    NotificationKind::General
}

/// The caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Notifications", body = [Notification]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let rows = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    params(("id" = u64, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked as read", body = Object, example = json!({
            "message": "Notification marked as read"
        })),
        (status = 404, description = "No such notification for the caller")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    // Matched on owner too, so another member's id reads as missing.
    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE id = ? AND user_id = ?",
    )
    .bind(id)
    .bind(auth.user_id)
    .fetch_one(pool.get_ref())
    .await?;

    if exists == 0 {
        return Err(ApiError::not_found("Notification not found"));
    }

    sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Notification marked as read" })))
}

/// Send a notification to one member or to everyone (admin)
#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body = SendNotification,
    responses(
        (status = 201, description = "Notifications sent", body = Object, example = json!({
            "message": "Notification sent",
            "sent": 42
        })),
        (status = 400, description = "Missing fields"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown recipient")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn send_notification(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SendNotification>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let recipient = payload.recipient.trim();
    let title = payload.title.trim();
    let message = payload.message.trim();
    if recipient.is_empty() || title.is_empty() || message.is_empty() {
        return Err(ApiError::bad_request(
            "recipient, title and message are required",
        ));
    }

    let recipients = if recipient.eq_ignore_ascii_case("all") {
        active_user_ids(pool.get_ref()).await?
    } else {
        let user_id = sqlx::query_scalar::<_, u64>("SELECT id FROM users WHERE email = ?")
            .bind(normalize_email(recipient))
            .fetch_optional(pool.get_ref())
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        vec![user_id]
    };

    let notes: Vec<NewNotification> = recipients
        .into_iter()
        .map(|user_id| NewNotification::new(user_id, payload.kind, title, message))
        .collect();

    let sent = notify_many(pool.get_ref(), &notes).await?;

    tracing::info!(sent, sender = %auth.email, "Notification sent");

    Ok(HttpResponse::Created().json(json!({
        "message": "Notification sent",
        "sent": sent
    })))
}
