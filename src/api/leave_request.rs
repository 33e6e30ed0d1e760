use crate::{
    api::{Pagination, notification::notify_best_effort, now_local},
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        leave_request::{LeaveRequest, LeaveStatus},
        notification::{NewNotification, NotificationKind},
    },
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const LEAVE_COLUMNS: &str = "id, user_id, user_email, start_date, end_date, reason, meal_type, \
     status, created_at, responded_at, responded_by";

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Going home for the weekend")]
    pub reason: String,
    /// Meals skipped; defaults to `both`
    #[schema(example = "both")]
    pub meal_type: Option<String>,
}

impl CreateLeave {
    fn validate(&self) -> Result<(), ApiError> {
        if self.end_date < self.start_date {
            return Err(ApiError::bad_request("end_date cannot be before start_date"));
        }
        if self.reason.trim().is_empty() {
            return Err(ApiError::bad_request("reason is required"));
        }
        Ok(())
    }

    /// Pending row as stored; `requested_at` is stamped with the app clock
    /// so it lines up with the billing month of `now_local()`.
    fn to_pending(&self, auth: &AuthUser, requested_at: NaiveDateTime) -> LeaveRequest {
        let meal_type = self
            .meal_type
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("both");

        LeaveRequest {
            id: 0,
            user_id: auth.user_id,
            user_email: auth.email.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            reason: self.reason.trim().to_string(),
            meal_type: meal_type.to_string(),
            status: LeaveStatus::Pending.to_string(),
            requested_at: Some(requested_at),
            responded_at: None,
            responded_by: None,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams)]
pub struct LeaveFilter {
    /// Admin only: filter by member id
    pub user_id: Option<u64>,
    /// Filter by status
    pub status: Option<LeaveStatus>,
    /// 1-based page number
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl LeaveFilter {
    fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

// typed binding for the dynamic WHERE clause
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

pub(crate) async fn fetch_user_leaves(
    pool: &MySqlPool,
    user_id: u64,
) -> Result<Vec<LeaveRequest>, sqlx::Error> {
    sqlx::query_as::<_, LeaveRequest>(&format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE user_id = ? ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn fetch_all_leaves(pool: &MySqlPool) -> Result<Vec<LeaveRequest>, sqlx::Error> {
    sqlx::query_as::<_, LeaveRequest>(&format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

async fn fetch_leave(pool: &MySqlPool, leave_id: u64) -> Result<LeaveRequest, ApiError> {
    sqlx::query_as::<_, LeaveRequest>(&format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?"
    ))
    .bind(leave_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Leave request not found"))
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = Object, example = json!({
            "message": "Leave request submitted",
            "status": "pending"
        })),
        (status = 400, description = "Bad request", body = Object, example = json!({
            "message": "end_date cannot be before start_date"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, ApiError> {
    payload.validate()?;
    let leave = payload.to_pending(&auth, now_local());

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (user_id, user_email, start_date, end_date, reason, meal_type, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(leave.user_id)
    .bind(&leave.user_email)
    .bind(leave.start_date)
    .bind(leave.end_date)
    .bind(&leave.reason)
    .bind(&leave.meal_type)
    .bind(&leave.status)
    .bind(leave.requested_at)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to create leave request");
        ApiError::Internal
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted",
        "id": result.last_insert_id(),
        "status": LeaveStatus::Pending
    })))
}

/* =========================
Approve / reject leave (admin)
========================= */
async fn respond_to_leave(
    auth: &AuthUser,
    pool: &MySqlPool,
    leave_id: u64,
    decision: LeaveStatus,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let leave = fetch_leave(pool, leave_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, responded_at = ?, responded_by = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(decision.as_ref())
    .bind(now_local())
    .bind(&auth.email)
    .bind(leave_id)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Respond to leave failed");
        ApiError::Internal
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request("Leave request already processed"));
    }

    let (kind, title) = match decision {
        LeaveStatus::Approved => (NotificationKind::LeaveApproved, "Leave approved"),
        _ => (NotificationKind::LeaveRejected, "Leave rejected"),
    };
    let message = format!(
        "Your leave from {} to {} was {}.",
        leave.start_date, leave.end_date, decision
    );
    notify_best_effort(pool, NewNotification::new(leave.user_id, kind, title, message)).await;

    tracing::info!(leave_id, status = %decision, by = %auth.email, "Leave request answered");

    Ok(HttpResponse::Ok().json(json!({ "message": title })))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave request to approve")),
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 400, description = "Already processed", body = Object, example = json!({
            "message": "Leave request already processed"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    respond_to_leave(&auth, pool.get_ref(), path.into_inner(), LeaveStatus::Approved).await
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "ID of the leave request to reject")),
    responses(
        (status = 200, description = "Leave rejected", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 400, description = "Already processed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    respond_to_leave(&auth, pool.get_ref(), path.into_inner(), LeaveStatus::Rejected).await
}

/// Details of one leave request (owner or admin)
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let leave = fetch_leave(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_admin(leave.user_id)?;

    Ok(HttpResponse::Ok().json(leave))
}

/// Leave requests; members see their own, admins see all
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, ApiError> {
    let (per_page, offset, page) = query.pagination().resolve();

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    let owner = if auth.is_admin {
        query.user_id
    } else {
        Some(auth.resolve_target(query.user_id)?)
    };

    if let Some(user_id) = owner {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::U64(user_id));
    }

    if let Some(status) = &query.status {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.as_ref()));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests{where_sql} \
         ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    );

    let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page,
        per_page,
        total,
    }))
}
