use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FeedbackStatus {
    Pending,
    Reviewed,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Feedback {
    #[schema(example = 1)]
    pub id: u64,
    pub user_id: u64,
    pub user_email: String,
    #[schema(example = "food_quality")]
    pub kind: String,
    #[schema(example = "Dinner was cold")]
    pub subject: String,
    pub message: String,
    #[schema(example = 3)]
    pub rating: u8,
    #[schema(example = "pending")]
    pub status: String,
    pub admin_response: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub responded_at: Option<NaiveDateTime>,
    pub responded_by: Option<String>,
}
