//! Authentication and authorization module

pub mod guard;
pub mod jwt;
pub mod middleware;

pub use guard::{permission_guard_middleware, AuthorizedResources, PermissionGuard};
pub use jwt::{Claims, JwtService};
pub use middleware::{extract_token, jwt_auth_middleware, AuthContext};
