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
pub enum PaymentStatus {
    Pending,
    /// Older rows were written as `paid`
    #[serde(alias = "paid")]
    #[strum(to_string = "verified", serialize = "paid")]
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum PaymentMethod {
    #[strum(serialize = "UPI")]
    Upi,
    #[strum(serialize = "offline")]
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Payment {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "asha@hostel.in")]
    pub user_email: String,
    #[schema(example = 3000.0)]
    pub amount: f64,
    #[schema(example = "INR")]
    pub currency: String,
    #[schema(example = "UPI123456789", nullable = true)]
    pub transaction_id: Option<String>,
    #[schema(example = "UPI")]
    pub payment_method: String,
    #[schema(example = "pending")]
    pub status: String,
    /// Billing month label, e.g. `January 2026`
    #[schema(example = "January 2026")]
    pub month: String,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub verified_at: Option<NaiveDateTime>,
    pub verified_by: Option<String>,
}

impl Payment {
    pub fn status(&self) -> Option<PaymentStatus> {
        self.status.parse().ok()
    }

    pub fn is_verified(&self) -> bool {
        self.status() == Some(PaymentStatus::Verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_paid_reads_as_verified() {
        assert_eq!("paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Verified);
        assert_eq!("verified".parse::<PaymentStatus>().unwrap(), PaymentStatus::Verified);
        assert_eq!(PaymentStatus::Verified.to_string(), "verified");
        assert_eq!(PaymentStatus::Verified.as_ref(), "verified");
    }

    #[test]
    fn legacy_paid_deserializes_as_verified() {
        let s: PaymentStatus = serde_json::from_str("\"paid\"").unwrap();
        assert_eq!(s, PaymentStatus::Verified);
    }

    #[test]
    fn method_labels() {
        assert_eq!(PaymentMethod::Upi.as_ref(), "UPI");
        assert_eq!(PaymentMethod::Offline.as_ref(), "offline");
    }
}
