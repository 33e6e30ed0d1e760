use crate::{
    api::{
        notification::{active_user_ids, notify_many},
        now_local,
    },
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        announcement::{Announcement, AnnouncementKind, Audience},
        notification::{NewNotification, NotificationKind, Priority},
    },
};
use actix_web::{HttpResponse, web};
use chrono::{Duration, NaiveDateTime};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

const ANNOUNCEMENT_COLUMNS: &str = "id, title, content, kind, target_audience, target_users, \
     is_active, created_at, created_by, expires_at, updated_at, updated_by";

const DEFAULT_EXPIRY_DAYS: u32 = 7;
const MAX_EXPIRY_DAYS: u32 = 3650;

#[derive(Deserialize, ToSchema)]
pub struct AnnouncementPayload {
    #[schema(example = "Mess closed on Sunday")]
    pub title: String,
    #[schema(example = "Kitchen maintenance, dinner at the canteen.")]
    pub content: String,
    #[serde(default = "default_kind")]
    #[schema(example = "info")]
    pub kind: AnnouncementKind,
    #[serde(default = "default_audience")]
    #[schema(example = "all")]
    pub target_audience: Audience,
    /// Member ids, used when the audience is `specific`
    #[serde(default)]
    #[schema(example = json!([7, 9]))]
    pub target_users: Vec<u64>,
    /// Days until the announcement stops showing; `0` never expires
    #[schema(example = 7)]
    pub expires_in_days: Option<u32>,
}

fn default_kind() -> AnnouncementKind {
    AnnouncementKind::Info
}

fn default_audience() -> Audience {
    Audience::All
}

impl AnnouncementPayload {
    fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(ApiError::bad_request("title and content are required"));
        }
        if self.target_audience == Audience::Specific && self.target_users.is_empty() {
            return Err(ApiError::bad_request(
                "target_users is required for a specific audience",
            ));
        }
        if self.expires_in_days.is_some_and(|days| days > MAX_EXPIRY_DAYS) {
            return Err(ApiError::bad_request(format!(
                "expires_in_days cannot exceed {MAX_EXPIRY_DAYS}"
            )));
        }
        Ok(())
    }

    /// Stored target list; empty unless the audience is `specific`.
    fn stored_targets(&self) -> String {
        let targets: &[u64] = match self.target_audience {
            Audience::Specific => &self.target_users,
            Audience::All => &[],
        };
        serde_json::to_string(targets).unwrap_or_else(|_| "[]".into())
    }

    fn expires_at(&self, now: NaiveDateTime) -> Result<Option<NaiveDateTime>, ApiError> {
        match self.expires_in_days.unwrap_or(DEFAULT_EXPIRY_DAYS) {
            0 => Ok(None),
            days => now
                .checked_add_signed(Duration::days(i64::from(days)))
                .map(Some)
                .ok_or_else(|| ApiError::bad_request("expires_in_days is out of range")),
        }
    }
}

/// Members who get a notification for a new announcement.
pub fn recipients(audience: Audience, targets: &[u64], active_users: &[u64]) -> Vec<u64> {
    let mut ids: Vec<u64> = match audience {
        Audience::All => active_users.to_vec(),
        Audience::Specific => targets
            .iter()
            .copied()
            .filter(|id| active_users.contains(id))
            .collect(),
    };
    ids.sort_unstable();
    ids.dedup();
    ids
}

async fn fetch_announcements(pool: &MySqlPool) -> Result<Vec<Announcement>, sqlx::Error> {
    sqlx::query_as::<_, Announcement>(&format!(
        "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await
}

/// Publish an announcement and notify its audience (admin)
#[utoipa::path(
    post,
    path = "/api/announcements",
    request_body = AnnouncementPayload,
    responses(
        (status = 201, description = "Announcement published", body = Object, example = json!({
            "message": "Announcement created",
            "id": 1,
            "notified": 42
        })),
        (status = 400, description = "Invalid announcement"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcements"
)]
pub async fn create_announcement(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<AnnouncementPayload>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    payload.validate()?;

    let now = now_local();
    let title = payload.title.trim();
    let content = payload.content.trim();

    let result = sqlx::query(
        r#"
        INSERT INTO announcements
            (title, content, kind, target_audience, target_users, is_active, created_at,
             created_by, expires_at)
        VALUES (?, ?, ?, ?, ?, TRUE, ?, ?, ?)
        "#,
    )
    .bind(title)
    .bind(content)
    .bind(payload.kind.as_ref())
    .bind(payload.target_audience.as_ref())
    .bind(payload.stored_targets())
    .bind(now)
    .bind(&auth.email)
    .bind(payload.expires_at(now)?)
    .execute(pool.get_ref())
    .await?;

    let active = active_user_ids(pool.get_ref()).await?;
    let priority = match payload.kind {
        AnnouncementKind::Urgent => Priority::High,
        _ => Priority::Normal,
    };
    let notes: Vec<NewNotification> =
        recipients(payload.target_audience, &payload.target_users, &active)
            .into_iter()
            .map(|user_id| {
                NewNotification::new(user_id, NotificationKind::Announcement, title, content)
                    .with_priority(priority)
            })
            .collect();

    // The announcement stands even if the fan-out fails.
    let notified = match notify_many(pool.get_ref(), &notes).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "Announcement fan-out failed");
            0
        }
    };

    tracing::info!(id = result.last_insert_id(), notified, by = %auth.email, "Announcement created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Announcement created",
        "id": result.last_insert_id(),
        "notified": notified
    })))
}

#[utoipa::path(
    put,
    path = "/api/announcements/{id}",
    params(("id" = u64, Path, description = "Announcement id")),
    request_body = AnnouncementPayload,
    responses(
        (status = 200, description = "Announcement updated"),
        (status = 400, description = "Invalid announcement"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Announcement not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcements"
)]
pub async fn update_announcement(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<AnnouncementPayload>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    payload.validate()?;

    let now = now_local();
    let result = sqlx::query(
        r#"
        UPDATE announcements
        SET title = ?, content = ?, kind = ?, target_audience = ?, target_users = ?,
            expires_at = ?, updated_at = ?, updated_by = ?
        WHERE id = ?
        "#,
    )
    .bind(payload.title.trim())
    .bind(payload.content.trim())
    .bind(payload.kind.as_ref())
    .bind(payload.target_audience.as_ref())
    .bind(payload.stored_targets())
    .bind(payload.expires_at(now)?)
    .bind(now)
    .bind(&auth.email)
    .bind(path.into_inner())
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Announcement not found"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Announcement updated" })))
}

#[utoipa::path(
    delete,
    path = "/api/announcements/{id}",
    params(("id" = u64, Path, description = "Announcement id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Announcement not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcements"
)]
pub async fn delete_announcement(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Announcement not found"));
    }

    Ok(HttpResponse::NoContent().finish())
}

/// Flip an announcement between active and inactive (admin)
#[utoipa::path(
    put,
    path = "/api/announcements/{id}/toggle",
    params(("id" = u64, Path, description = "Announcement id")),
    responses(
        (status = 200, description = "New state", body = Object, example = json!({
            "is_active": false
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Announcement not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcements"
)]
pub async fn toggle_announcement(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let id = path.into_inner();

    let current = sqlx::query_scalar::<_, bool>("SELECT is_active FROM announcements WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Announcement not found"))?;

    sqlx::query(
        "UPDATE announcements SET is_active = ?, updated_at = ?, updated_by = ? WHERE id = ?",
    )
    .bind(!current)
    .bind(now_local())
    .bind(&auth.email)
    .bind(id)
    .execute(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "is_active": !current })))
}

/// Announcements visible to the caller
#[utoipa::path(
    get,
    path = "/api/announcements",
    responses((status = 200, description = "Visible announcements", body = [Announcement])),
    security(("bearer_auth" = [])),
    tag = "Announcements"
)]
pub async fn visible_announcements(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let now = now_local();
    let visible: Vec<Announcement> = fetch_announcements(pool.get_ref())
        .await?
        .into_iter()
        .filter(|a| a.is_visible_to(auth.user_id, now))
        .collect();

    Ok(HttpResponse::Ok().json(visible))
}

/// Every announcement, including inactive and expired ones (admin)
#[utoipa::path(
    get,
    path = "/api/announcements/all",
    responses(
        (status = 200, description = "All announcements", body = [Announcement]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcements"
)]
pub async fn all_announcements(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(fetch_announcements(pool.get_ref()).await?))
}
