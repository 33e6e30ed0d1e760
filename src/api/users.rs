use crate::{
    auth::{auth::AuthUser, handlers::insert_user, policy::AdminPolicy},
    billing::anchor_cache,
    error::ApiError,
    model::{
        role::Role,
        user::{USER_COLUMNS, User},
    },
    utils::db_utils::{UpdatableColumns, build_update_sql, execute_update},
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use utoipa::ToSchema;

/// Profile fields a member may change; `name` is never nulled.
const PROFILE_COLUMNS: UpdatableColumns<'static> = UpdatableColumns {
    table: "users",
    id_column: "id",
    columns: &[
        ("name", false),
        ("phone", true),
        ("room_number", true),
        ("hostel", true),
    ],
};

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "ravi@hostel.in")]
    pub email: String,
    #[schema(example = "secret123")]
    pub password: String,
    #[schema(example = "Ravi")]
    pub name: String,
    /// Create the account with the admin role
    #[serde(default)]
    pub is_admin: bool,
}

async fn fetch_user(pool: &MySqlPool, user_id: u64) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

fn reject_blank_name(payload: &Value) -> Result<(), ApiError> {
    match payload.get("name") {
        Some(Value::String(name)) if name.trim().is_empty() => {
            Err(ApiError::bad_request("name cannot be empty"))
        }
        _ => Ok(()),
    }
}

/// The caller's profile
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Profile", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let user = fetch_user(pool.get_ref(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Partial profile update
#[utoipa::path(
    put,
    path = "/api/profile",
    request_body(
        content = Object,
        description = "Any of name, phone, room_number, hostel",
        example = json!({ "phone": "+919800000000", "room_number": "B-204" })
    ),
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 400, description = "Unknown or invalid field", body = Object, example = json!({
            "message": "Field email cannot be updated"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    reject_blank_name(&payload)?;
    let update = build_update_sql(&PROFILE_COLUMNS, &payload, auth.user_id, &[])?;

    execute_update(pool.get_ref(), update).await.map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Profile update failed");
        ApiError::Internal
    })?;

    let user = fetch_user(pool.get_ref(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// All registered members (admin)
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Users", body = [User]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(users))
}

/// Create a member account (admin)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User created",
            "id": 8
        })),
        (status = 400, description = "Missing fields"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let role = if payload.is_admin {
        Role::Admin
    } else {
        Role::Member
    };
    let id = insert_user(
        &payload.email,
        &payload.password,
        &payload.name,
        role,
        pool.get_ref(),
    )
    .await?;

    tracing::info!(user_id = id, by = %auth.email, "User created by admin");

    Ok(HttpResponse::Created().json(json!({
        "message": "User created",
        "id": id
    })))
}

/// Delete a member (admin); allow-listed admins are protected
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Cannot delete own account"),
        (status = 403, description = "Forbidden or protected account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    policy: web::Data<AdminPolicy>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    if user_id == auth.user_id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }

    let user = fetch_user(pool.get_ref(), user_id).await?;
    if policy.is_allow_listed(&user.email) {
        return Err(ApiError::forbidden("Cannot delete an administrator account"));
    }

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    anchor_cache::forget(user_id).await;

    tracing::info!(user_id, email = %user.email, by = %auth.email, "User deleted");

    Ok(HttpResponse::NoContent().finish())
}
