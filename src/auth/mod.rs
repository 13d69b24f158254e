//! Authentication and authorization

pub mod credentials;
pub mod rbac;
pub mod token;

pub use credentials::{Authenticator, CredentialStore, StaticCredentialStore, User};
pub use rbac::{Authorizer, PermissionTable};
pub use token::{TokenClaims, TokenService};
