use crate::api::announcement::AnnouncementPayload;
use crate::api::attendance::MarkAttendance;
use crate::api::billing::BillingSummary;
use crate::api::feedback::{CreateFeedback, RespondFeedback};
use crate::api::leave_request::{CreateLeave, LeaveListResponse};
use crate::api::menu::MenuPayload;
use crate::api::notification::SendNotification;
use crate::api::payment::{OfflinePayment, PaymentStatusResponse, SubmitPayment};
use crate::api::qr::GenerateQr;
use crate::api::report::{DailyCount, DashboardStats, MonthlyReport, TopAttendee};
use crate::api::users::CreateUser;
use crate::auth::handlers::LoginResponse;
use crate::billing::BillingCycle;
use crate::model::announcement::{Announcement, AnnouncementKind, Audience};
use crate::model::attendance::{AttendanceRecord, MealType};
use crate::model::daily_qr::DailyQr;
use crate::model::feedback::{Feedback, FeedbackStatus};
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::menu::MenuItem;
use crate::model::notification::{Notification, NotificationKind, Priority};
use crate::model::payment::{Payment, PaymentStatus};
use crate::model::user::User;
use crate::models::{LoginReqDto, RegisterReq};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MessMates API",
        version = "1.0.0",
        description = r#"
## MessMates

Backend of a **hostel mess**: members mark attendance by scanning the daily QR
code, see their rolling 30-day billing cycle and estimated bill, pay the
monthly fee, request leave and send feedback. Administrators run the menu,
verify payments, answer leave and feedback, publish announcements and read
monthly reports.

### Billing
- A member's cycle is anchored on their first attendance day and rolls every 30 days.
- Estimated bill = (meals in the current cycle - approved leaves requested this
  calendar month) x per-meal rate. It may be negative.

### Security
Endpoints under `/api` need a **JWT Bearer** access token from `/auth/login`.
Admin endpoints accept the admin role or an allow-listed email.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::users::get_profile,
        crate::api::users::update_profile,
        crate::api::users::list_users,
        crate::api::users::create_user,
        crate::api::users::delete_user,

        crate::api::qr::generate_qr,
        crate::api::qr::latest_qr,

        crate::api::attendance::mark_attendance,
        crate::api::attendance::today_status,
        crate::api::attendance::list_attendance,
        crate::api::attendance::export_attendance,

        crate::api::billing::my_summary,
        crate::api::billing::member_summary,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::payment::submit_payment,
        crate::api::payment::record_offline_payment,
        crate::api::payment::verify_payment,
        crate::api::payment::reject_payment,
        crate::api::payment::list_payments,
        crate::api::payment::payment_status,

        crate::api::menu::weekly_menu,
        crate::api::menu::today_menu,
        crate::api::menu::add_menu_item,
        crate::api::menu::update_menu_item,
        crate::api::menu::delete_menu_item,

        crate::api::feedback::submit_feedback,
        crate::api::feedback::list_feedback,
        crate::api::feedback::respond_feedback,

        crate::api::announcement::create_announcement,
        crate::api::announcement::update_announcement,
        crate::api::announcement::delete_announcement,
        crate::api::announcement::toggle_announcement,
        crate::api::announcement::visible_announcements,
        crate::api::announcement::all_announcements,

        crate::api::notification::list_notifications,
        crate::api::notification::mark_read,
        crate::api::notification::send_notification,

        crate::api::report::get_monthly_report,
        crate::api::report::export_monthly_report,
        crate::api::report::admin_stats
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            LoginResponse,
            User,
            CreateUser,
            DailyQr,
            GenerateQr,
            MealType,
            AttendanceRecord,
            MarkAttendance,
            BillingCycle,
            BillingSummary,
            LeaveRequest,
            LeaveStatus,
            CreateLeave,
            LeaveListResponse,
            Payment,
            PaymentStatus,
            SubmitPayment,
            OfflinePayment,
            PaymentStatusResponse,
            MenuItem,
            MenuPayload,
            Feedback,
            FeedbackStatus,
            CreateFeedback,
            RespondFeedback,
            Announcement,
            AnnouncementKind,
            Audience,
            AnnouncementPayload,
            Notification,
            NotificationKind,
            Priority,
            SendNotification,
            MonthlyReport,
            DailyCount,
            TopAttendee,
            DashboardStats
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token rotation"),
        (name = "Users", description = "Profiles and member management"),
        (name = "Attendance", description = "Daily QR code and attendance"),
        (name = "Billing", description = "Rolling billing cycle and estimated bill"),
        (name = "Leave", description = "Leave requests"),
        (name = "Payments", description = "Monthly fee payments"),
        (name = "Menu", description = "Weekly menu"),
        (name = "Feedback", description = "Member feedback"),
        (name = "Announcements", description = "Announcements"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Reports", description = "Monthly reports and dashboard counters"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/auth/login",
            "/api/attendance",
            "/api/billing/summary",
            "/api/billing/summary/{user_id}",
            "/api/leave/{leave_id}/approve",
            "/api/payments/status",
            "/api/announcements/all",
            "/api/reports/monthly/export",
            "/api/admin/stats",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "{expected} missing");
        }

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("BillingSummary"));
    }
}
