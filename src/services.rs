pub mod checkin_service;
pub mod dashboard_service;
pub mod plan_service;
pub mod reminder_service;
pub mod route_service;
pub mod visit_service;

pub use checkin_service::CheckinService;
pub use dashboard_service::DashboardService;
pub use plan_service::PlanService;
pub use reminder_service::ReminderService;
pub use route_service::RouteService;
pub use visit_service::VisitService;
