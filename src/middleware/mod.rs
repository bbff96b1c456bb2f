pub mod auth;
pub mod response;

pub use auth::{authenticate, optional_authenticate, AuthIdentity, MaybeIdentity, RequireAdmin, RequireStaff};
pub use response::{ApiResponse, ApiResult};
