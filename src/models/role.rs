//! Role and permission grant models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::permission::{ResourceId, ResourceType, RoleId};

/// Forum role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
}

/// Explicit allow/deny attached to a (role, resource, permission)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "forum_permission_effect", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OverrideEffect {
    Allow,
    Deny,
}

impl OverrideEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideEffect::Allow => "allow",
            OverrideEffect::Deny => "deny",
        }
    }
}

/// Global grant row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RolePermission {
    pub role_id: RoleId,
    pub permission: String,
    pub granted: bool,
}

/// Resource override row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PermissionOverride {
    pub role_id: RoleId,
    pub resource_type: ResourceType,
    pub resource_id: ResourceId,
    pub permission: String,
    pub effect: OverrideEffect,
    pub updated_at: DateTime<Utc>,
}

/// Set global grant request
#[derive(Debug, Deserialize)]
pub struct SetGrantRequest {
    pub granted: bool,
}

/// Upsert override request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertOverrideRequest {
    pub resource_type: ResourceType,
    #[validate(range(min = 1))]
    pub resource_id: ResourceId,
    #[validate(length(min = 1, max = 64))]
    pub permission: String,
    pub effect: OverrideEffect,
}

/// Clear override request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClearOverrideRequest {
    pub resource_type: ResourceType,
    #[validate(range(min = 1))]
    pub resource_id: ResourceId,
    #[validate(length(min = 1, max = 64))]
    pub permission: String,
}

/// Outcome of removing a user's role assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanupOutcome {
    Removed { count: u64 },
    /// The user had no assignments; treated as success
    NothingToRemove,
}
