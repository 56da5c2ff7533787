//! Permission declarations, resolved resources and authorization decisions

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type RoleId = i64;
pub type ResourceId = i64;

/// Forum resource a permission can be scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "forum_resource_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Category,
    Thread,
    Post,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Category => "category",
            ResourceType::Thread => "thread",
            ResourceType::Post => "post",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the resource id for a declaration is located in the request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolutionStrategy {
    /// Global permission, no resource
    None,
    /// Route parameter holding the resource id
    RouteParam(String),
    /// Field of the JSON request body holding the resource id
    RequestBody(String),
    /// Route parameter holding a thread id; the resource is the thread's category
    ParentThread(String),
    /// Route parameter holding a post id; the resource is the post's thread, or
    /// that thread's category
    ParentPost(String),
}

impl ResolutionStrategy {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionStrategy::None => "none",
            ResolutionStrategy::RouteParam(_) => "route_param",
            ResolutionStrategy::RequestBody(_) => "request_body",
            ResolutionStrategy::ParentThread(_) => "parent_thread",
            ResolutionStrategy::ParentPost(_) => "parent_post",
        }
    }

    /// Name of the route parameter or body field the strategy reads
    pub fn source(&self) -> Option<&str> {
        match self {
            ResolutionStrategy::None => None,
            ResolutionStrategy::RouteParam(name)
            | ResolutionStrategy::RequestBody(name)
            | ResolutionStrategy::ParentThread(name)
            | ResolutionStrategy::ParentPost(name) => Some(name),
        }
    }

    pub fn reads_body(&self) -> bool {
        matches!(self, ResolutionStrategy::RequestBody(_))
    }
}

/// Why a declaration was rejected at registration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationFault {
    #[error("permission name is empty")]
    EmptyPermission,

    #[error("{0} strategy has an empty parameter name")]
    EmptySource(&'static str),

    #[error("{0} resolution strategies supplied, at most one is allowed")]
    MultipleStrategies(usize),

    #[error("resolution strategy given without a resource type")]
    StrategyWithoutResourceType,

    #[error("resource type {0} given without a resolution strategy")]
    ResourceTypeWithoutStrategy(ResourceType),

    #[error("{strategy} strategy cannot resolve a {resource_type}")]
    UnsupportedDerivation {
        strategy: &'static str,
        resource_type: ResourceType,
    },
}

/// Programmer error raised when an action's permission metadata is inconsistent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid permission declaration `{permission}`: {fault}")]
pub struct InvalidDeclaration {
    pub permission: String,
    pub fault: DeclarationFault,
}

/// Permission requirement attached to an action
///
/// Immutable once built. Holds the permission name, the resource type the
/// permission is scoped to (if any) and the single strategy used to find the
/// resource id in the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionDeclaration {
    permission: String,
    resource_type: Option<ResourceType>,
    strategy: ResolutionStrategy,
}

impl PermissionDeclaration {
    pub fn new(
        permission: impl Into<String>,
        resource_type: Option<ResourceType>,
        strategy: ResolutionStrategy,
    ) -> Result<Self, InvalidDeclaration> {
        let permission = permission.into();

        if let Err(fault) = Self::check(&permission, resource_type, &strategy) {
            return Err(InvalidDeclaration { permission, fault });
        }

        Ok(Self {
            permission,
            resource_type,
            strategy,
        })
    }

    /// Permission evaluated against global grants only
    pub fn global(permission: impl Into<String>) -> Result<Self, InvalidDeclaration> {
        Self::new(permission, None, ResolutionStrategy::None)
    }

    /// Attribute-style builder with one setter per strategy
    pub fn builder(permission: impl Into<String>) -> DeclarationBuilder {
        DeclarationBuilder {
            permission: permission.into(),
            resource_type: None,
            strategies: Vec::new(),
        }
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }

    pub fn resource_type(&self) -> Option<ResourceType> {
        self.resource_type
    }

    pub fn strategy(&self) -> &ResolutionStrategy {
        &self.strategy
    }

    pub fn is_global(&self) -> bool {
        self.resource_type.is_none()
    }

    fn check(
        permission: &str,
        resource_type: Option<ResourceType>,
        strategy: &ResolutionStrategy,
    ) -> Result<(), DeclarationFault> {
        if permission.trim().is_empty() {
            return Err(DeclarationFault::EmptyPermission);
        }

        let resource_type = match (resource_type, strategy) {
            (None, ResolutionStrategy::None) => return Ok(()),
            (None, _) => return Err(DeclarationFault::StrategyWithoutResourceType),
            (Some(t), ResolutionStrategy::None) => {
                return Err(DeclarationFault::ResourceTypeWithoutStrategy(t))
            }
            (Some(t), _) => t,
        };

        if strategy.source().is_some_and(|s| s.trim().is_empty()) {
            return Err(DeclarationFault::EmptySource(strategy.kind()));
        }

        // thread -> category, post -> thread -> category
        let derivable = match strategy {
            ResolutionStrategy::ParentThread(_) => resource_type == ResourceType::Category,
            ResolutionStrategy::ParentPost(_) => {
                matches!(resource_type, ResourceType::Thread | ResourceType::Category)
            }
            _ => true,
        };

        if !derivable {
            return Err(DeclarationFault::UnsupportedDerivation {
                strategy: strategy.kind(),
                resource_type,
            });
        }

        Ok(())
    }
}

impl fmt::Display for PermissionDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.resource_type, self.strategy.source()) {
            (Some(t), Some(source)) => write!(
                f,
                "{} on {} via {}({})",
                self.permission,
                t,
                self.strategy.kind(),
                source
            ),
            _ => f.write_str(&self.permission),
        }
    }
}

/// Builder mirroring annotation metadata, where every strategy is an
/// independent optional field. Conflicts are rejected in [`build`].
///
/// [`build`]: DeclarationBuilder::build
#[derive(Debug, Clone)]
pub struct DeclarationBuilder {
    permission: String,
    resource_type: Option<ResourceType>,
    strategies: Vec<ResolutionStrategy>,
}

impl DeclarationBuilder {
    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    pub fn from_route_param(mut self, name: impl Into<String>) -> Self {
        self.strategies.push(ResolutionStrategy::RouteParam(name.into()));
        self
    }

    pub fn from_request_body(mut self, field: impl Into<String>) -> Self {
        self.strategies.push(ResolutionStrategy::RequestBody(field.into()));
        self
    }

    pub fn from_parent_thread(mut self, param: impl Into<String>) -> Self {
        self.strategies.push(ResolutionStrategy::ParentThread(param.into()));
        self
    }

    pub fn from_parent_post(mut self, param: impl Into<String>) -> Self {
        self.strategies.push(ResolutionStrategy::ParentPost(param.into()));
        self
    }

    pub fn build(mut self) -> Result<PermissionDeclaration, InvalidDeclaration> {
        if self.strategies.len() > 1 {
            return Err(InvalidDeclaration {
                permission: self.permission,
                fault: DeclarationFault::MultipleStrategies(self.strategies.len()),
            });
        }

        let strategy = self.strategies.pop().unwrap_or(ResolutionStrategy::None);
        PermissionDeclaration::new(self.permission, self.resource_type, strategy)
    }
}

/// Resource a declaration was resolved to for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ResourceRef {
    Global,
    Scoped {
        resource_type: ResourceType,
        resource_id: ResourceId,
    },
}

impl ResourceRef {
    pub fn scoped(resource_type: ResourceType, resource_id: ResourceId) -> Self {
        ResourceRef::Scoped {
            resource_type,
            resource_id,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Global => f.write_str("global"),
            ResourceRef::Scoped {
                resource_type,
                resource_id,
            } => write!(f, "{}:{}", resource_type, resource_id),
        }
    }
}

/// Internal reason for a denial. Logged, never sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    /// No held role grants the permission
    NotGranted,
    /// A held role carries a deny override on the resource
    ExplicitDeny { role_id: RoleId },
    /// The resource id was absent from the request or malformed
    MissingResource { param: String },
    /// A parent lookup found no such entity
    ResourceNotFound {
        resource_type: ResourceType,
        resource_id: ResourceId,
    },
    /// A collaborator failed while resolving or evaluating
    LookupFailed,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::NotGranted => f.write_str("not granted"),
            DenialReason::ExplicitDeny { role_id } => {
                write!(f, "denied by override on role {}", role_id)
            }
            DenialReason::MissingResource { param } => {
                write!(f, "missing resource id `{}`", param)
            }
            DenialReason::ResourceNotFound {
                resource_type,
                resource_id,
            } => write!(f, "{} {} not found", resource_type, resource_id),
            DenialReason::LookupFailed => f.write_str("lookup failed"),
        }
    }
}

/// Outcome of evaluating one declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub permission: String,
    /// `None` when the resource could not be resolved
    pub resource: Option<ResourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denial: Option<DenialReason>,
}

impl AuthorizationDecision {
    pub fn allow(permission: impl Into<String>, resource: ResourceRef) -> Self {
        Self {
            allowed: true,
            permission: permission.into(),
            resource: Some(resource),
            denial: None,
        }
    }

    pub fn deny(
        permission: impl Into<String>,
        resource: Option<ResourceRef>,
        reason: DenialReason,
    ) -> Self {
        Self {
            allowed: false,
            permission: permission.into(),
            resource,
            denial: Some(reason),
        }
    }
}

/// Permission names used by the forum
pub mod names {
    pub const CAN_VIEW: &str = "canView";
    pub const CAN_POST: &str = "canPost";
    pub const CAN_REPLY: &str = "canReply";
    pub const CAN_MODERATE: &str = "canModerate";
    pub const CAN_EDIT_ROLES: &str = "canEditRoles";
    pub const CAN_EDIT_CATEGORIES: &str = "canEditCategories";
    pub const CAN_ACCESS_ADMIN_TOOLS: &str = "canAccessAdminTools";

    /// Permissions that can be scoped to a category
    pub const CATEGORY_SCOPED: [&str; 4] = [CAN_VIEW, CAN_POST, CAN_REPLY, CAN_MODERATE];

    /// Every known permission
    pub const ALL: [&str; 7] = [
        CAN_VIEW,
        CAN_POST,
        CAN_REPLY,
        CAN_MODERATE,
        CAN_EDIT_ROLES,
        CAN_EDIT_CATEGORIES,
        CAN_ACCESS_ADMIN_TOOLS,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_declaration() {
        let decl = PermissionDeclaration::global(names::CAN_EDIT_ROLES).unwrap();
        assert!(decl.is_global());
        assert_eq!(decl.strategy(), &ResolutionStrategy::None);
        assert_eq!(decl.to_string(), "canEditRoles");
    }

    #[test]
    fn test_scoped_declaration() {
        let decl = PermissionDeclaration::new(
            names::CAN_POST,
            Some(ResourceType::Category),
            ResolutionStrategy::RouteParam("categoryId".to_string()),
        )
        .unwrap();

        assert!(!decl.is_global());
        assert_eq!(decl.resource_type(), Some(ResourceType::Category));
        assert_eq!(decl.to_string(), "canPost on category via route_param(categoryId)");
    }

    #[test]
    fn test_builder_rejects_two_strategies() {
        let err = PermissionDeclaration::builder(names::CAN_POST)
            .resource_type(ResourceType::Category)
            .from_route_param("categoryId")
            .from_request_body("categoryId")
            .build()
            .unwrap_err();

        assert_eq!(err.fault, DeclarationFault::MultipleStrategies(2));
        assert_eq!(err.permission, "canPost");
    }

    #[test]
    fn test_resource_type_without_strategy() {
        let err = PermissionDeclaration::builder(names::CAN_POST)
            .resource_type(ResourceType::Category)
            .build()
            .unwrap_err();

        assert_eq!(
            err.fault,
            DeclarationFault::ResourceTypeWithoutStrategy(ResourceType::Category)
        );
    }

    #[test]
    fn test_strategy_without_resource_type() {
        let err = PermissionDeclaration::builder(names::CAN_POST)
            .from_route_param("categoryId")
            .build()
            .unwrap_err();

        assert_eq!(err.fault, DeclarationFault::StrategyWithoutResourceType);
    }

    #[test]
    fn test_empty_names_rejected() {
        let err = PermissionDeclaration::global("  ").unwrap_err();
        assert_eq!(err.fault, DeclarationFault::EmptyPermission);

        let err = PermissionDeclaration::new(
            names::CAN_VIEW,
            Some(ResourceType::Category),
            ResolutionStrategy::RouteParam(String::new()),
        )
        .unwrap_err();
        assert_eq!(err.fault, DeclarationFault::EmptySource("route_param"));
    }

    #[test]
    fn test_parent_derivations() {
        assert!(PermissionDeclaration::builder(names::CAN_REPLY)
            .resource_type(ResourceType::Category)
            .from_parent_thread("threadId")
            .build()
            .is_ok());

        assert!(PermissionDeclaration::builder(names::CAN_MODERATE)
            .resource_type(ResourceType::Thread)
            .from_parent_post("postId")
            .build()
            .is_ok());

        let err = PermissionDeclaration::builder(names::CAN_REPLY)
            .resource_type(ResourceType::Thread)
            .from_parent_thread("threadId")
            .build()
            .unwrap_err();
        assert_eq!(
            err.fault,
            DeclarationFault::UnsupportedDerivation {
                strategy: "parent_thread",
                resource_type: ResourceType::Thread,
            }
        );

        assert!(PermissionDeclaration::builder(names::CAN_MODERATE)
            .resource_type(ResourceType::Post)
            .from_parent_post("postId")
            .build()
            .is_err());
    }

    #[test]
    fn test_resource_ref_display() {
        assert_eq!(ResourceRef::Global.to_string(), "global");
        assert_eq!(ResourceRef::scoped(ResourceType::Category, 5).to_string(), "category:5");
    }
}
