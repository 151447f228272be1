//! Warden Auth: password hashing, token issuance/validation/revocation,
//! permission resolution and the two-tier admin authorization layer.

pub mod admin;
pub mod config;
pub mod error;
pub mod management;
pub mod otp;
pub mod password;
pub mod permission;
pub mod service;
pub mod tenant;
pub mod token;
pub mod token_service;

pub use admin::{AdminChanges, AdminLoginOutput, AdminPrincipal, AdminService, RegisterAdmin};
pub use config::AuthConfig;
pub use error::AuthError;
pub use management::{ManagementService, NewUser};
pub use otp::LoginCodeService;
pub use permission::PermissionService;
pub use service::{AuthService, LoginInput, LoginOutput, RegisterInput};
pub use tenant::TenantService;
pub use token::{Claims, Subject};
pub use token_service::{TokenPair, TokenService};
