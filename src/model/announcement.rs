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
pub enum AnnouncementKind {
    Info,
    Urgent,
    Event,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Audience {
    All,
    Specific,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Announcement {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Mess closed on Sunday")]
    pub title: String,
    pub content: String,
    #[schema(example = "info")]
    pub kind: String,
    #[schema(example = "all")]
    pub target_audience: String,
    /// JSON array of user ids, only meaningful for `specific`
    #[schema(example = "[7, 9]")]
    pub target_users: String,
    pub is_active: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
    pub created_by: String,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub expires_at: Option<NaiveDateTime>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub updated_at: Option<NaiveDateTime>,
    pub updated_by: Option<String>,
}

impl Announcement {
    pub fn audience(&self) -> Option<Audience> {
        self.target_audience.parse().ok()
    }

    pub fn target_user_ids(&self) -> Vec<u64> {
        serde_json::from_str(&self.target_users).unwrap_or_default()
    }

    pub fn is_visible_to(&self, user_id: u64, now: NaiveDateTime) -> bool {
        if !self.is_active {
            return false;
        }
        if self.expires_at.is_some_and(|at| at <= now) {
            return false;
        }
        match self.audience() {
            Some(Audience::All) => true,
            Some(Audience::Specific) => self.target_user_ids().contains(&user_id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn announcement(audience: &str, targets: &str) -> Announcement {
        Announcement {
            id: 1,
            title: "Holi special".into(),
            content: "Sweets at dinner".into(),
            kind: "event".into(),
            target_audience: audience.into(),
            target_users: targets.into(),
            is_active: true,
            created_at: now() - Duration::days(1),
            created_by: "admin@mess.in".into(),
            expires_at: Some(now() + Duration::days(6)),
            updated_at: None,
            updated_by: None,
        }
    }

    #[test]
    fn everyone_sees_all_audience() {
        assert!(announcement("all", "[]").is_visible_to(42, now()));
    }

    #[test]
    fn specific_audience_is_limited_to_targets() {
        let a = announcement("specific", "[7, 9]");
        assert!(a.is_visible_to(7, now()));
        assert!(!a.is_visible_to(8, now()));
    }

    #[test]
    fn inactive_or_expired_is_hidden() {
        let mut a = announcement("all", "[]");
        a.is_active = false;
        assert!(!a.is_visible_to(7, now()));

        let mut b = announcement("all", "[]");
        b.expires_at = Some(now());
        assert!(!b.is_visible_to(7, now()));

        let mut c = announcement("all", "[]");
        c.expires_at = None;
        assert!(c.is_visible_to(7, now()));
    }

    #[test]
    fn broken_target_list_hides_specific_announcement() {
        let a = announcement("specific", "not json");
        assert!(a.target_user_ids().is_empty());
        assert!(!a.is_visible_to(7, now()));
    }
}
