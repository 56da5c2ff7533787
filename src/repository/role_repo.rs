//! Role repository (角色与权限数据访问)

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        permission::{ResourceId, ResourceType, RoleId},
        role::*,
    },
    services::permission_service::PermissionStore,
};

pub struct RoleRepository {
    db: PgPool,
}

impl RoleRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Roles ====================

    /// 列出所有角色
    pub async fn list(&self) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM forum_roles ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        Ok(roles)
    }

    /// 根据 ID 查找角色
    pub async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM forum_roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(role)
    }

    // ==================== Global grants ====================

    /// 获取角色的全局权限
    pub async fn get_role_permissions(
        &self,
        role_id: RoleId,
    ) -> Result<Vec<RolePermission>, AppError> {
        let permissions = sqlx::query_as::<_, RolePermission>(
            r#"
            SELECT role_id, permission, granted
            FROM forum_role_permissions
            WHERE role_id = $1
            ORDER BY permission
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    /// 设置角色的全局权限
    pub async fn set_global_grant(
        &self,
        role_id: RoleId,
        permission: &str,
        granted: bool,
    ) -> Result<RolePermission, AppError> {
        let row = sqlx::query_as::<_, RolePermission>(
            r#"
            INSERT INTO forum_role_permissions (role_id, permission, granted)
            VALUES ($1, $2, $3)
            ON CONFLICT (role_id, permission) DO UPDATE SET granted = EXCLUDED.granted
            RETURNING role_id, permission, granted
            "#,
        )
        .bind(role_id)
        .bind(permission)
        .bind(granted)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    // ==================== Overrides ====================

    /// 列出角色的资源覆盖规则
    pub async fn list_overrides(
        &self,
        role_id: RoleId,
    ) -> Result<Vec<PermissionOverride>, AppError> {
        let overrides = sqlx::query_as::<_, PermissionOverride>(
            r#"
            SELECT role_id, resource_type, resource_id, permission, effect, updated_at
            FROM forum_permission_overrides
            WHERE role_id = $1
            ORDER BY resource_type, resource_id, permission
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(overrides)
    }

    /// 新增或更新覆盖规则
    pub async fn upsert_override(
        &self,
        role_id: RoleId,
        req: &UpsertOverrideRequest,
    ) -> Result<PermissionOverride, AppError> {
        let row = sqlx::query_as::<_, PermissionOverride>(
            r#"
            INSERT INTO forum_permission_overrides
                (role_id, resource_type, resource_id, permission, effect)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (role_id, resource_type, resource_id, permission)
            DO UPDATE SET effect = EXCLUDED.effect, updated_at = NOW()
            RETURNING role_id, resource_type, resource_id, permission, effect, updated_at
            "#,
        )
        .bind(role_id)
        .bind(req.resource_type)
        .bind(req.resource_id)
        .bind(&req.permission)
        .bind(req.effect)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    /// 删除覆盖规则
    pub async fn clear_override(
        &self,
        role_id: RoleId,
        req: &ClearOverrideRequest,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM forum_permission_overrides
            WHERE role_id = $1 AND resource_type = $2 AND resource_id = $3 AND permission = $4
            "#,
        )
        .bind(role_id)
        .bind(req.resource_type)
        .bind(req.resource_id)
        .bind(&req.permission)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== User roles ====================

    /// 撤销用户的所有角色（账号删除时清理）
    pub async fn remove_user_roles(&self, user_id: &str) -> Result<CleanupOutcome, AppError> {
        let result = sqlx::query("DELETE FROM forum_user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(match result.rows_affected() {
            0 => CleanupOutcome::NothingToRemove,
            count => CleanupOutcome::Removed { count },
        })
    }
}

#[async_trait]
impl PermissionStore for RoleRepository {
    async fn user_role_ids(&self, user_id: &str) -> Result<Vec<RoleId>, AppError> {
        let ids = sqlx::query_scalar::<_, RoleId>(
            "SELECT role_id FROM forum_user_roles WHERE user_id = $1 ORDER BY role_id",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ids)
    }

    async fn global_grant(&self, role_id: RoleId, permission: &str) -> Result<bool, AppError> {
        let granted = sqlx::query_scalar::<_, bool>(
            "SELECT granted FROM forum_role_permissions WHERE role_id = $1 AND permission = $2",
        )
        .bind(role_id)
        .bind(permission)
        .fetch_optional(&self.db)
        .await?;

        Ok(granted.unwrap_or(false))
    }

    async fn resource_override(
        &self,
        role_id: RoleId,
        resource_type: ResourceType,
        resource_id: ResourceId,
        permission: &str,
    ) -> Result<Option<OverrideEffect>, AppError> {
        let effect = sqlx::query_scalar::<_, OverrideEffect>(
            r#"
            SELECT effect
            FROM forum_permission_overrides
            WHERE role_id = $1 AND resource_type = $2 AND resource_id = $3 AND permission = $4
            "#,
        )
        .bind(role_id)
        .bind(resource_type)
        .bind(resource_id)
        .bind(permission)
        .fetch_optional(&self.db)
        .await?;

        Ok(effect)
    }
}
