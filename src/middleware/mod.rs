pub mod auth;
pub mod response;

pub use auth::{require_session, CurrentUser};
pub use response::{ApiResponse, ApiResult};
