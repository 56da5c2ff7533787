//! Database repository layer

pub mod entity_repo;
pub mod role_repo;

pub use entity_repo::EntityRepository;
pub use role_repo::RoleRepository;
