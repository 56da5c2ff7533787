//! 权限检查服务
//! 根据调用者角色、权限声明和请求上下文给出授权结论（默认拒绝）

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{
        context::RequestContext,
        permission::{
            AuthorizationDecision, DenialReason, PermissionDeclaration, ResourceId, ResourceRef,
            ResourceType, RoleId,
        },
        role::OverrideEffect,
    },
    services::resolver::{EntityLookup, ResourceResolver},
};

/// 角色与权限存储（只读）
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// 用户持有的角色
    async fn user_role_ids(&self, user_id: &str) -> Result<Vec<RoleId>, AppError>;

    /// 角色的全局权限
    async fn global_grant(&self, role_id: RoleId, permission: &str) -> Result<bool, AppError>;

    /// 角色在某个资源上的覆盖规则
    async fn resource_override(
        &self,
        role_id: RoleId,
        resource_type: ResourceType,
        resource_id: ResourceId,
        permission: &str,
    ) -> Result<Option<OverrideEffect>, AppError>;
}

pub struct PermissionService {
    store: Arc<dyn PermissionStore>,
    resolver: ResourceResolver,
}

impl PermissionService {
    pub fn new(store: Arc<dyn PermissionStore>, entities: Arc<dyn EntityLookup>) -> Self {
        Self {
            store,
            resolver: ResourceResolver::new(entities),
        }
    }

    /// 获取调用者的角色
    pub async fn caller_roles(&self, user_id: &str) -> Result<Vec<RoleId>, AppError> {
        let mut roles = self.store.user_role_ids(user_id).await?;
        roles.sort_unstable();
        roles.dedup();
        Ok(roles)
    }

    /// 评估单个权限声明
    ///
    /// 任何解析或存储失败都转为拒绝，不会向调用方返回错误。
    pub async fn evaluate(
        &self,
        roles: &[RoleId],
        declaration: &PermissionDeclaration,
        ctx: &RequestContext,
    ) -> AuthorizationDecision {
        let permission = declaration.permission();

        let decision = match self.resolver.resolve(declaration, ctx).await {
            Ok(resource) => match self.check(roles, permission, resource).await {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::warn!(
                        permission = %permission,
                        resource = %resource,
                        error = %e,
                        "Permission store lookup failed"
                    );
                    AuthorizationDecision::deny(
                        permission,
                        Some(resource),
                        DenialReason::LookupFailed,
                    )
                }
            },
            Err(e) => {
                tracing::warn!(
                    permission = %permission,
                    declaration = %declaration,
                    error = %e,
                    "Resource resolution failed"
                );
                AuthorizationDecision::deny(permission, None, e.denial_reason())
            }
        };

        record_decision(&decision);
        decision
    }

    /// 所有声明都必须允许；返回各声明解析出的资源，或第一个拒绝结论
    pub async fn authorize_all(
        &self,
        roles: &[RoleId],
        declarations: &[PermissionDeclaration],
        ctx: &RequestContext,
    ) -> Result<Vec<ResourceRef>, AuthorizationDecision> {
        let mut resources = Vec::with_capacity(declarations.len());

        for declaration in declarations {
            let decision = self.evaluate(roles, declaration, ctx).await;
            match (decision.allowed, decision.resource) {
                (true, Some(resource)) => resources.push(resource),
                _ => return Err(decision),
            }
        }

        Ok(resources)
    }

    /// 供请求分发层调用的授权入口
    pub async fn authorize(
        &self,
        roles: &[RoleId],
        declarations: &[PermissionDeclaration],
        ctx: &RequestContext,
    ) -> bool {
        self.authorize_all(roles, declarations, ctx).await.is_ok()
    }

    /// 批量计算权限在某个资源上的生效值，查询失败按拒绝处理
    pub async fn effective_permissions(
        &self,
        roles: &[RoleId],
        resource: ResourceRef,
        permissions: &[&str],
    ) -> BTreeMap<String, bool> {
        let mut result = BTreeMap::new();

        for &permission in permissions {
            let allowed = match self.check(roles, permission, resource).await {
                Ok(decision) => decision.allowed,
                Err(e) => {
                    tracing::warn!(
                        permission = %permission,
                        resource = %resource,
                        error = %e,
                        "Permission store lookup failed"
                    );
                    false
                }
            };
            result.insert(permission.to_string(), allowed);
        }

        result
    }

    /// 全局权限按角色取或；资源权限中任一角色的 deny 覆盖优先，
    /// 其余角色以覆盖值（无覆盖时为全局值）取或
    async fn check(
        &self,
        roles: &[RoleId],
        permission: &str,
        resource: ResourceRef,
    ) -> Result<AuthorizationDecision, AppError> {
        let (resource_type, resource_id) = match resource {
            ResourceRef::Global => {
                for &role_id in roles {
                    if self.store.global_grant(role_id, permission).await? {
                        return Ok(AuthorizationDecision::allow(permission, resource));
                    }
                }
                return Ok(AuthorizationDecision::deny(
                    permission,
                    Some(resource),
                    DenialReason::NotGranted,
                ));
            }
            ResourceRef::Scoped {
                resource_type,
                resource_id,
            } => (resource_type, resource_id),
        };

        let mut allowed = false;

        for &role_id in roles {
            let effective = match self
                .store
                .resource_override(role_id, resource_type, resource_id, permission)
                .await?
            {
                Some(OverrideEffect::Deny) => {
                    return Ok(AuthorizationDecision::deny(
                        permission,
                        Some(resource),
                        DenialReason::ExplicitDeny { role_id },
                    ));
                }
                Some(OverrideEffect::Allow) => true,
                // 已有角色允许时无需再查全局值，但仍需继续扫描 deny
                None => !allowed && self.store.global_grant(role_id, permission).await?,
            };
            allowed |= effective;
        }

        if allowed {
            Ok(AuthorizationDecision::allow(permission, resource))
        } else {
            Ok(AuthorizationDecision::deny(
                permission,
                Some(resource),
                DenialReason::NotGranted,
            ))
        }
    }
}

fn record_decision(decision: &AuthorizationDecision) {
    let outcome = if decision.allowed { "allowed" } else { "denied" };
    metrics::counter!("authz_decisions_total", "outcome" => outcome).increment(1);

    match (&decision.denial, decision.resource) {
        (None, _) => tracing::debug!(
            permission = %decision.permission,
            resource = ?decision.resource,
            "Permission granted"
        ),
        (Some(reason), Some(resource)) => tracing::warn!(
            permission = %decision.permission,
            resource = %resource,
            reason = %reason,
            "Permission denied"
        ),
        (Some(reason), None) => tracing::warn!(
            permission = %decision.permission,
            reason = %reason,
            "Permission denied"
        ),
    }
}
