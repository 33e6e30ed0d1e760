use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct MenuItem {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Monday")]
    pub day: String,
    #[schema(example = "lunch")]
    pub meal_type: String,
    #[schema(example = "Dal, rice, chapati, salad")]
    pub items: String,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub updated_at: Option<NaiveDateTime>,
}

impl MenuItem {
    /// `day` holds a weekday name; comparison ignores case.
    pub fn is_served_on(&self, date: NaiveDate) -> bool {
        self.day.trim().eq_ignore_ascii_case(&date.format("%A").to_string())
    }
}
