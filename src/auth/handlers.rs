use crate::{
    api::now_local,
    auth::{
        auth::bearer_token,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
        policy::AdminPolicy,
    },
    config::Config,
    db::is_duplicate_key,
    error::ApiError,
    model::role::Role,
    models::{LoginReqDto, RegisterReq, TokenType, UserSql, normalize_email},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

/// Inserts a new account. Shared by self-registration and admin user creation.
pub async fn insert_user(
    email: &str,
    password: &str,
    name: &str,
    role: Role,
    pool: &MySqlPool,
) -> Result<u64, ApiError> {
    let email = normalize_email(email);
    let name = name.trim();

    if email.is_empty() || password.is_empty() || name.is_empty() {
        return Err(ApiError::bad_request(
            "Email, password and name must not be empty",
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }

    let hashed = hash_password(password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::Internal
    })?;

    let result = sqlx::query(r#"INSERT INTO users (email, password, name, role_id) VALUES (?, ?, ?, ?)"#)
        .bind(&email)
        .bind(hashed)
        .bind(name)
        .bind(role.id())
        .execute(pool)
        .await;

    match result {
        Ok(done) => {
            info!(user_id = done.last_insert_id(), "User created");
            Ok(done.last_insert_id())
        }
        Err(e) if is_duplicate_key(&e) => {
            Err(ApiError::Conflict("Email already registered".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Self-registration; always creates a regular member
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = Object, example = json!({
            "message": "User registered successfully"
        })),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    user: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    insert_user(&user.email, &user.password, &user.name, Role::Member, pool.get_ref()).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully"
    })))
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lets the client pick the admin or the member dashboard
    pub is_admin: bool,
}

async fn store_refresh_token(
    pool: &MySqlPool,
    user_id: u64,
    jti: &str,
    exp: usize,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(jti)
    .bind(exp as i64)
    .execute(pool)
    .await
    .map(|_| ())
}

fn token_error(e: jsonwebtoken::errors::Error) -> ApiError {
    error!(error = %e, "Failed to sign token");
    ApiError::Internal
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Tokens issued", body = LoginResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, policy, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    policy: web::Data<AdminPolicy>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Err(ApiError::bad_request("Email and password required"));
    }

    let email = normalize_email(&user.email);
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    debug!("Fetching user from database");

    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, email, password, role_id, is_active
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| {
        info!("Invalid credentials: user not found");
        invalid()
    })?;

    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account disabled");
        return Err(invalid());
    }

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(invalid());
    }

    debug!("Password verified");

    let access_token = generate_access_token(
        db_user.id,
        &db_user.email,
        db_user.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(token_error)?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        db_user.id,
        &db_user.email,
        db_user.role_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(token_error)?;

    debug!(user_id = db_user.id, jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(pool.get_ref(), db_user.id, &refresh_claims.jti, refresh_claims.exp)
        .await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(now_local())
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        // not worth failing the login over
        error!(error = %e, "Failed to update last_login_at");
    }

    let is_admin = Role::from_id(db_user.role_id)
        .is_some_and(|role| policy.is_admin(&db_user.email, role));

    info!(is_admin, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        is_admin,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated tokens", body = Object, example = json!({
            "access_token": "eyJ...",
            "refresh_token": "eyJ..."
        })),
        (status = 401, description = "Refresh token missing, invalid or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let unauthorized = || ApiError::Unauthorized("Invalid refresh token".into());

    let token = bearer_token(&req).ok_or_else(unauthorized)?;
    let claims = verify_token(token, &config.jwt_secret).map_err(|_| unauthorized())?;

    if claims.token_type != TokenType::Refresh {
        return Err(unauthorized());
    }

    let record = sqlx::query_as::<_, (u64, u64, bool)>(
        r#"
        SELECT id, user_id, revoked
        FROM refresh_tokens
        WHERE jti = ?
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await?;

    let (record_id, user_id) = match record {
        Some((id, user_id, revoked)) if !revoked => (id, user_id),
        _ => return Err(unauthorized()),
    };

    // Rotate: the presented token is single use.
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await?;

    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        &claims.sub,
        claims.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(token_error)?;

    store_refresh_token(pool.get_ref(), user_id, &new_claims.jti, new_claims.exp).await?;

    let access_token = generate_access_token(
        claims.user_id,
        &claims.sub,
        claims.role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(token_error)?;

    Ok(HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    })))
}

/// Revokes the presented refresh token. Always answers 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Some(token) = bearer_token(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}
