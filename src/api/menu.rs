use crate::{
    api::now_local,
    auth::auth::AuthUser,
    error::ApiError,
    model::menu::MenuItem,
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

const MENU_COLUMNS: &str = "id, day, meal_type, items, created_at, updated_at";

// Monday first, unknown day names last.
const DAY_ORDER: &str = "FIELD(LOWER(day), 'monday', 'tuesday', 'wednesday', 'thursday', \
     'friday', 'saturday', 'sunday') = 0, \
     FIELD(LOWER(day), 'monday', 'tuesday', 'wednesday', 'thursday', 'friday', 'saturday', 'sunday')";

#[derive(Deserialize, ToSchema)]
pub struct MenuPayload {
    #[schema(example = "Monday")]
    pub day: String,
    #[schema(example = "lunch")]
    pub meal_type: String,
    #[schema(example = "Dal, rice, chapati, salad")]
    pub items: String,
}

impl MenuPayload {
    /// Trimmed `(day, meal_type, items)`; all three must be non-empty.
    fn fields(&self) -> Result<(&str, &str, &str), ApiError> {
        let (day, meal_type, items) = (self.day.trim(), self.meal_type.trim(), self.items.trim());
        if day.is_empty() || meal_type.is_empty() || items.is_empty() {
            return Err(ApiError::bad_request("day, meal_type and items are required"));
        }
        Ok((day, meal_type, items))
    }
}

async fn fetch_menu(pool: &MySqlPool) -> Result<Vec<MenuItem>, sqlx::Error> {
    sqlx::query_as::<_, MenuItem>(&format!(
        "SELECT {MENU_COLUMNS} FROM weekly_menu ORDER BY {DAY_ORDER}, meal_type"
    ))
    .fetch_all(pool)
    .await
}

/// The whole weekly menu
#[utoipa::path(
    get,
    path = "/api/menu",
    responses((status = 200, description = "Menu ordered by day", body = [MenuItem])),
    security(("bearer_auth" = [])),
    tag = "Menu"
)]
pub async fn weekly_menu(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(fetch_menu(pool.get_ref()).await?))
}

/// What is served today
#[utoipa::path(
    get,
    path = "/api/menu/today",
    responses((status = 200, description = "Today's entries", body = [MenuItem])),
    security(("bearer_auth" = [])),
    tag = "Menu"
)]
pub async fn today_menu(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let today = now_local().date();
    let items: Vec<MenuItem> = fetch_menu(pool.get_ref())
        .await?
        .into_iter()
        .filter(|item| item.is_served_on(today))
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

#[utoipa::path(
    post,
    path = "/api/menu",
    request_body = MenuPayload,
    responses(
        (status = 201, description = "Menu entry added"),
        (status = 400, description = "Missing fields"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Menu"
)]
pub async fn add_menu_item(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<MenuPayload>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let (day, meal_type, items) = payload.fields()?;

    let result = sqlx::query("INSERT INTO weekly_menu (day, meal_type, items) VALUES (?, ?, ?)")
        .bind(day)
        .bind(meal_type)
        .bind(items)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Menu item added",
        "id": result.last_insert_id()
    })))
}

#[utoipa::path(
    put,
    path = "/api/menu/{id}",
    params(("id" = u64, Path, description = "Menu entry id")),
    request_body = MenuPayload,
    responses(
        (status = 200, description = "Menu entry updated"),
        (status = 400, description = "Missing fields"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Menu entry not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Menu"
)]
pub async fn update_menu_item(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<MenuPayload>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let (day, meal_type, items) = payload.fields()?;
    let id = path.into_inner();

    let result = sqlx::query(
        "UPDATE weekly_menu SET day = ?, meal_type = ?, items = ?, updated_at = ? WHERE id = ?",
    )
    .bind(day)
    .bind(meal_type)
    .bind(items)
    .bind(now_local())
    .bind(id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Menu item not found"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Menu item updated" })))
}

#[utoipa::path(
    delete,
    path = "/api/menu/{id}",
    params(("id" = u64, Path, description = "Menu entry id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Menu entry not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Menu"
)]
pub async fn delete_menu_item(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let result = sqlx::query("DELETE FROM weekly_menu WHERE id = ?")
        .bind(path.into_inner())
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Menu item not found"));
    }

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_rejected() {
        let payload = MenuPayload {
            day: "Monday".into(),
            meal_type: " ".into(),
            items: "Poha".into(),
        };
        assert!(payload.fields().is_err());
    }

    #[test]
    fn fields_are_trimmed() {
        let payload = MenuPayload {
            day: " Monday ".into(),
            meal_type: "breakfast".into(),
            items: " Poha, tea ".into(),
        };
        assert_eq!(payload.fields().unwrap(), ("Monday", "breakfast", "Poha, tea"));
    }
}
