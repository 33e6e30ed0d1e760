use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Day key format used for `attendance.date` and daily QR codes.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display,
    EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MealType {
    #[default]
    General,
    Breakfast,
    Lunch,
    Dinner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "asha@hostel.in")]
    pub user_email: String,
    /// Local day the attendance was marked for
    #[schema(example = "2026-01-01", nullable = true)]
    pub date: Option<String>,
    #[schema(example = "2026-01-01T08:15:00", format = "date-time", value_type = Option<String>)]
    pub marked_at: Option<NaiveDateTime>,
    pub qr_id: Option<u64>,
    #[schema(example = "general")]
    pub meal_type: String,
}

impl AttendanceRecord {
    /// The date this attendance counts for.
    ///
    /// The stored day key wins; `marked_at` is the fallback. `None` means the
    /// record carries no usable date and must be left out of every count.
    pub fn event_date(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), DAY_KEY_FORMAT).ok())
            .or_else(|| self.marked_at.map(|t| t.date()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: Option<&str>, marked_at: Option<&str>) -> AttendanceRecord {
        AttendanceRecord {
            id: 1,
            user_id: 1,
            user_email: "a@b.c".into(),
            date: date.map(str::to_string),
            marked_at: marked_at
                .map(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()),
            qr_id: None,
            meal_type: "general".into(),
        }
    }

    #[test]
    fn day_key_takes_precedence_over_timestamp() {
        let r = record(Some("2024-03-02"), Some("2024-03-01T23:59:00"));
        assert_eq!(r.event_date(), NaiveDate::from_ymd_opt(2024, 3, 2));
    }

    #[test]
    fn falls_back_to_timestamp_when_day_key_is_garbage() {
        let r = record(Some("yesterday"), Some("2024-03-01T07:00:00"));
        assert_eq!(r.event_date(), NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn no_usable_date_at_all() {
        assert_eq!(record(None, None).event_date(), None);
        assert_eq!(record(Some("2024-13-45"), None).event_date(), None);
    }

    #[test]
    fn meal_type_parses_lowercase() {
        assert_eq!("lunch".parse::<MealType>().unwrap(), MealType::Lunch);
        assert!("brunch".parse::<MealType>().is_err());
        assert_eq!(MealType::Dinner.as_ref(), "dinner");
    }

    #[test]
    fn meal_type_defaults_to_general() {
        assert_eq!(MealType::default(), MealType::General);
    }
}
