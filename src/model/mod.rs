pub mod announcement;
pub mod attendance;
pub mod daily_qr;
pub mod feedback;
pub mod leave_request;
pub mod menu;
pub mod notification;
pub mod payment;
pub mod role;
pub mod user;
