use chrono::{NaiveDate, NaiveDateTime};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::attendance::DAY_KEY_FORMAT;

const QR_PREFIX: &str = "meal-attendance-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct DailyQr {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "meal-attendance-2026-01-01-1767225600000")]
    pub qr_value: String,
    #[schema(example = "general")]
    pub meal_type: String,
    pub created_by: String,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ScanRejection {
    #[display(fmt = "This QR code is not valid for today")]
    NotToday,
    #[display(fmt = "QR code does not match today's code")]
    Mismatch,
}

/// Encodes the day and the generation instant, so two codes minted on the
/// same day never collide.
pub fn qr_value_for(day: NaiveDate, generated_at_millis: i64) -> String {
    format!("{}{}-{}", QR_PREFIX, day.format(DAY_KEY_FORMAT), generated_at_millis)
}

/// Day encoded in a scanned value, if it is one of ours.
pub fn parse_qr_day(value: &str) -> Option<NaiveDate> {
    let rest = value.trim().strip_prefix(QR_PREFIX)?;
    let day = rest.get(..10)?;
    let millis = rest.get(10..)?.strip_prefix('-')?;
    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(day, DAY_KEY_FORMAT).ok()
}

impl DailyQr {
    /// Accepts `scanned` only if this code is today's and the values match.
    pub fn check_scan(&self, scanned: &str, today: NaiveDate) -> Result<(), ScanRejection> {
        if self.date != today {
            return Err(ScanRejection::NotToday);
        }
        if parse_qr_day(scanned).is_some_and(|day| day != today) {
            return Err(ScanRejection::NotToday);
        }
        if scanned.trim() != self.qr_value {
            return Err(ScanRejection::Mismatch);
        }
        Ok(())
    }
}
