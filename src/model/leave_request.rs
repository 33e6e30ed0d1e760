use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "asha@hostel.in")]
    pub user_email: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Going home for the weekend")]
    pub reason: String,
    #[schema(example = "both")]
    pub meal_type: String,
    #[schema(example = "pending")]
    pub status: String,
    /// When the request was submitted (not the range it covers)
    #[sqlx(rename = "created_at")]
    #[schema(example = "2026-01-01T10:00:00", format = "date-time", value_type = Option<String>)]
    pub requested_at: Option<NaiveDateTime>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub responded_at: Option<NaiveDateTime>,
    pub responded_by: Option<String>,
}

impl LeaveRequest {
    /// Parsed status; unknown values from old rows yield `None`.
    pub fn status(&self) -> Option<LeaveStatus> {
        self.status.parse().ok()
    }
}
