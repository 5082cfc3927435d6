pub mod activity_service;
pub mod auth_service;
pub mod dashboard_service;
pub mod generic_service;
pub mod notification_service;
pub mod organization_service;
pub mod quota_service;
pub mod user_service;

pub use activity_service::ActivityService;
pub use auth_service::AuthService;
pub use dashboard_service::DashboardService;
pub use generic_service::GenericService;
pub use notification_service::NotificationService;
pub use organization_service::OrganizationService;
pub use quota_service::QuotaService;
pub use user_service::UserService;
