use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    General,
    Reminder,
    Announcement,
    LeaveApproved,
    LeaveRejected,
    PaymentVerified,
    PaymentRejected,
    FeedbackResponse,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Notification {
    #[schema(example = 1)]
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "leave_approved")]
    pub kind: String,
    #[schema(example = "Leave approved")]
    pub title: String,
    pub message: String,
    #[schema(example = "normal")]
    pub priority: String,
    pub is_read: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
}

/// A notification about to be written for one recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: u64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: Priority,
}

impl NewNotification {
    pub fn new(
        user_id: u64,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            priority: Priority::Normal,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_snake_case() {
        assert_eq!(NotificationKind::LeaveApproved.as_ref(), "leave_approved");
        assert_eq!(
            "feedback_response".parse::<NotificationKind>().unwrap(),
            NotificationKind::FeedbackResponse
        );
        let json = serde_json::to_string(&NotificationKind::PaymentRejected).unwrap();
        assert_eq!(json, "\"payment_rejected\"");
    }
}
