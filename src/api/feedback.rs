use crate::{
    api::{notification::notify_best_effort, now_local},
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        feedback::{Feedback, FeedbackStatus},
        notification::{NewNotification, NotificationKind},
    },
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

const FEEDBACK_COLUMNS: &str = "id, user_id, user_email, kind, subject, message, rating, status, \
     admin_response, created_at, responded_at, responded_by";

#[derive(Deserialize, ToSchema)]
pub struct CreateFeedback {
    #[schema(example = "food_quality")]
    pub kind: String,
    #[schema(example = "Dinner was cold")]
    pub subject: String,
    #[schema(example = "Rotis were cold on Tuesday night.")]
    pub message: String,
    /// 1 to 5
    #[schema(example = 3, minimum = 1, maximum = 5)]
    pub rating: u8,
}

impl CreateFeedback {
    fn validate(&self) -> Result<(), ApiError> {
        if self.kind.trim().is_empty()
            || self.subject.trim().is_empty()
            || self.message.trim().is_empty()
        {
            return Err(ApiError::bad_request("kind, subject and message are required"));
        }
        if !(1..=5).contains(&self.rating) {
            return Err(ApiError::bad_request("rating must be between 1 and 5"));
        }
        Ok(())
    }
}

#[derive(Deserialize, ToSchema)]
pub struct RespondFeedback {
    /// `reviewed` or `resolved`
    #[schema(example = "resolved")]
    pub status: FeedbackStatus,
    #[schema(example = "Thanks, the warmer has been fixed.")]
    pub response: String,
}

#[utoipa::path(
    post,
    path = "/api/feedback",
    request_body = CreateFeedback,
    responses(
        (status = 201, description = "Feedback submitted"),
        (status = 400, description = "Invalid feedback", body = Object, example = json!({
            "message": "rating must be between 1 and 5"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn submit_feedback(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateFeedback>,
) -> Result<HttpResponse, ApiError> {
    payload.validate()?;

    let result = sqlx::query(
        r#"
        INSERT INTO feedback
            (user_id, user_email, kind, subject, message, rating, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(&auth.email)
    .bind(payload.kind.trim())
    .bind(payload.subject.trim())
    .bind(payload.message.trim())
    .bind(payload.rating)
    .bind(FeedbackStatus::Pending.as_ref())
    .bind(now_local())
    .execute(pool.get_ref())
    .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Feedback submitted",
        "id": result.last_insert_id(),
        "status": FeedbackStatus::Pending
    })))
}

/// Feedback; members see their own, admins see all
#[utoipa::path(
    get,
    path = "/api/feedback",
    responses((status = 200, description = "Feedback, newest first", body = [Feedback])),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn list_feedback(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let rows = if auth.is_admin {
        sqlx::query_as::<_, Feedback>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(pool.get_ref())
        .await?
    } else {
        sqlx::query_as::<_, Feedback>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE user_id = ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(auth.user_id)
        .fetch_all(pool.get_ref())
        .await?
    };

    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    put,
    path = "/api/feedback/{id}/respond",
    params(("id" = u64, Path, description = "Feedback id")),
    request_body = RespondFeedback,
    responses(
        (status = 200, description = "Response saved"),
        (status = 400, description = "Invalid status or empty response"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Feedback not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn respond_feedback(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<RespondFeedback>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    if payload.status == FeedbackStatus::Pending {
        return Err(ApiError::bad_request("status must be reviewed or resolved"));
    }
    let response = payload.response.trim();
    if response.is_empty() {
        return Err(ApiError::bad_request("response is required"));
    }

    let id = path.into_inner();
    let feedback = sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::not_found("Feedback not found"))?;

    sqlx::query(
        r#"
        UPDATE feedback
        SET status = ?, admin_response = ?, responded_at = ?, responded_by = ?
        WHERE id = ?
        "#,
    )
    .bind(payload.status.as_ref())
    .bind(response)
    .bind(now_local())
    .bind(&auth.email)
    .bind(id)
    .execute(pool.get_ref())
    .await?;

    notify_best_effort(
        pool.get_ref(),
        NewNotification::new(
            feedback.user_id,
            NotificationKind::FeedbackResponse,
            format!("Response to: {}", feedback.subject),
            response,
        ),
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Response saved",
        "status": payload.status
    })))
}
