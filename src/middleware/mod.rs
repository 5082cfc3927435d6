pub mod activity;
pub mod auth;
pub mod quota;
pub mod response;
pub mod validate_organization;
pub mod validate_user;

pub use activity::activity_log_middleware;
pub use auth::{jwt_auth_middleware, AuthUser};
pub use quota::enforce_quota_middleware;
pub use response::{ApiResponse, ApiResult};
pub use validate_organization::{validate_organization_middleware, OrganizationContext};
pub use validate_user::{validate_user_middleware, ValidatedUser};
