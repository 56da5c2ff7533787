//! Business logic services layer

pub mod permission_service;
pub mod policy;
pub mod resolver;

pub use permission_service::{PermissionService, PermissionStore};
pub use policy::ActionPolicy;
pub use resolver::{EntityLookup, ResolutionError, ResourceResolver};
