use chrono::{Local, NaiveDateTime};
use serde::Deserialize;
use utoipa::IntoParams;

pub mod announcement;
pub mod attendance;
pub mod billing;
pub mod feedback;
pub mod leave_request;
pub mod menu;
pub mod notification;
pub mod payment;
pub mod qr;
pub mod report;
pub mod users;

/// Wall-clock time of the mess; day boundaries follow local midnight.
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Payment month label such as `January 2026`.
pub fn month_label(at: NaiveDateTime) -> String {
    at.format("%B %Y").to_string()
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct Pagination {
    /// 1-based page number
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl Pagination {
    /// `(limit, offset, page)` with `per_page` capped at 100.
    pub fn resolve(&self) -> (u64, u64, u64) {
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let page = self.page.unwrap_or(1).max(1);
        (per_page, (page - 1).saturating_mul(per_page), page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn month_label_is_long_month_and_year() {
        let at = NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(month_label(at), "October 2026");
    }

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(p.resolve(), (100, 0, 1));

        let p = Pagination {
            page: Some(3),
            per_page: None,
        };
        assert_eq!(p.resolve(), (20, 40, 3));
    }

    #[test]
    fn huge_page_saturates_the_offset() {
        let p = Pagination {
            page: Some(u64::MAX),
            per_page: Some(100),
        };
        assert_eq!(p.resolve(), (100, u64::MAX, u64::MAX));
    }
}
