use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A mess member as exposed over the API (no password hash).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "asha@hostel.in")]
    pub email: String,
    #[schema(example = "Asha")]
    pub name: String,
    #[schema(example = "+919800000000", nullable = true)]
    pub phone: Option<String>,
    #[schema(example = "B-204", nullable = true)]
    pub room_number: Option<String>,
    #[schema(example = "Block B", nullable = true)]
    pub hostel: Option<String>,
    #[schema(example = 2)]
    pub role_id: u8,
    pub is_active: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub last_login_at: Option<NaiveDateTime>,
}

pub const USER_COLUMNS: &str = "id, email, name, phone, room_number, hostel, role_id, is_active, \
     created_at, last_login_at";
