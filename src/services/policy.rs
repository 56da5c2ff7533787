//! Permission declarations registered per action

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::permission::{
    names, DeclarationBuilder, InvalidDeclaration, PermissionDeclaration, ResourceType,
};

/// Action name -> ordered declarations. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ActionPolicy {
    actions: HashMap<String, Arc<[PermissionDeclaration]>>,
}

impl ActionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach declarations to an action. Registering the same action again
    /// appends to its list, like repeated annotations.
    pub fn register<I>(
        &mut self,
        action: &str,
        declarations: I,
    ) -> Result<&mut Self, InvalidDeclaration>
    where
        I: IntoIterator<Item = DeclarationBuilder>,
    {
        let mut built = self
            .actions
            .get(action)
            .map(|existing| existing.to_vec())
            .unwrap_or_default();

        for builder in declarations {
            built.push(builder.build()?);
        }

        tracing::debug!(action, declarations = built.len(), "Registered action policy");
        self.actions.insert(action.to_string(), built.into());
        Ok(self)
    }

    pub fn declarations(&self, action: &str) -> Option<Arc<[PermissionDeclaration]>> {
        self.actions.get(action).cloned()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Policy for the routes served by this crate
    pub fn forum_defaults() -> Result<Self, InvalidDeclaration> {
        let mut policy = Self::new();

        policy
            .register(
                actions::CATEGORY_PERMISSIONS,
                [PermissionDeclaration::builder(names::CAN_VIEW)
                    .resource_type(ResourceType::Category)
                    .from_route_param("categoryId")],
            )?
            .register(
                actions::THREAD_PERMISSIONS,
                [PermissionDeclaration::builder(names::CAN_VIEW)
                    .resource_type(ResourceType::Category)
                    .from_parent_thread("threadId")],
            )?
            .register(
                actions::POST_PERMISSIONS,
                [PermissionDeclaration::builder(names::CAN_VIEW)
                    .resource_type(ResourceType::Category)
                    .from_parent_post("postId")],
            )?
            .register(
                actions::ROLES_MANAGE,
                [
                    PermissionDeclaration::builder(names::CAN_ACCESS_ADMIN_TOOLS),
                    PermissionDeclaration::builder(names::CAN_EDIT_ROLES),
                ],
            )?;

        Ok(policy)
    }
}

/// Action names used by the router
pub mod actions {
    pub const CATEGORY_PERMISSIONS: &str = "permissions.category";
    pub const THREAD_PERMISSIONS: &str = "permissions.thread";
    pub const POST_PERMISSIONS: &str = "permissions.post";
    pub const ROLES_MANAGE: &str = "roles.manage";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::permission::{DeclarationFault, ResolutionStrategy};

    #[test]
    fn test_forum_defaults() {
        let policy = ActionPolicy::forum_defaults().unwrap();
        assert_eq!(policy.len(), 4);

        let decls = policy.declarations(actions::POST_PERMISSIONS).unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].strategy(), &ResolutionStrategy::ParentPost("postId".to_string()));

        let decls = policy.declarations(actions::ROLES_MANAGE).unwrap();
        assert_eq!(decls.len(), 2);
        assert!(decls.iter().all(|d| d.is_global()));
    }

    #[test]
    fn test_register_rejects_invalid_declaration() {
        let mut policy = ActionPolicy::new();
        let err = policy
            .register(
                "thread.create",
                [PermissionDeclaration::builder(names::CAN_POST)
                    .resource_type(ResourceType::Category)
                    .from_route_param("categoryId")
                    .from_request_body("categoryId")],
            )
            .unwrap_err();

        assert_eq!(err.fault, DeclarationFault::MultipleStrategies(2));
        assert!(policy.declarations("thread.create").is_none());
    }

    #[test]
    fn test_register_appends() {
        let mut policy = ActionPolicy::new();
        policy
            .register("category.edit", [PermissionDeclaration::builder(names::CAN_EDIT_CATEGORIES)])
            .unwrap()
            .register(
                "category.edit",
                [PermissionDeclaration::builder(names::CAN_ACCESS_ADMIN_TOOLS)],
            )
            .unwrap();

        let decls = policy.declarations("category.edit").unwrap();
        let names: Vec<_> = decls.iter().map(|d| d.permission()).collect();
        assert_eq!(names, vec!["canEditCategories", "canAccessAdminTools"]);
    }

    #[test]
    fn test_unknown_action() {
        assert!(ActionPolicy::new().declarations("nope").is_none());
        assert!(ActionPolicy::new().is_empty());
    }
}
