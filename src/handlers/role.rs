//! 角色权限管理的 HTTP 处理器
//! 路由已由 roles.manage 守卫保护

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    auth::AuthContext,
    error::AppError,
    middleware::AppState,
    models::{permission::RoleId, role::*},
};

/// 列出所有角色
pub async fn list_roles(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let roles = state.role_repo.list().await?;

    Ok(Json(json!({
        "roles": roles,
        "count": roles.len()
    })))
}

/// 获取角色及其全局权限
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(role_id): Path<RoleId>,
) -> Result<impl IntoResponse, AppError> {
    let role = state
        .role_repo
        .find_by_id(role_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let permissions = state.role_repo.get_role_permissions(role_id).await?;

    Ok(Json(json!({
        "role": role,
        "permissions": permissions
    })))
}

/// 设置全局权限
pub async fn set_global_grant(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path((role_id, permission)): Path<(RoleId, String)>,
    Json(req): Json<SetGrantRequest>,
) -> Result<impl IntoResponse, AppError> {
    if permission.is_empty() || permission.len() > 64 {
        return Err(AppError::BadRequest("Invalid permission name".to_string()));
    }

    state
        .role_repo
        .find_by_id(role_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let grant = state
        .role_repo
        .set_global_grant(role_id, &permission, req.granted)
        .await?;

    tracing::info!(
        actor = %auth_context.user_id,
        role_id,
        permission = %permission,
        granted = req.granted,
        "Global grant updated"
    );

    Ok(Json(json!({ "grant": grant })))
}

/// 列出角色的资源覆盖规则
pub async fn list_overrides(
    State(state): State<Arc<AppState>>,
    Path(role_id): Path<RoleId>,
) -> Result<impl IntoResponse, AppError> {
    let overrides = state.role_repo.list_overrides(role_id).await?;

    Ok(Json(json!({
        "overrides": overrides,
        "count": overrides.len()
    })))
}

/// 新增或更新覆盖规则
pub async fn upsert_override(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(role_id): Path<RoleId>,
    Json(req): Json<UpsertOverrideRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    state
        .role_repo
        .find_by_id(role_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let row = state.role_repo.upsert_override(role_id, &req).await?;

    tracing::info!(
        actor = %auth_context.user_id,
        role_id,
        resource_type = %req.resource_type,
        resource_id = req.resource_id,
        permission = %req.permission,
        effect = req.effect.as_str(),
        "Permission override set"
    );

    Ok(Json(json!({ "override": row })))
}

/// 删除覆盖规则
pub async fn clear_override(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(role_id): Path<RoleId>,
    Json(req): Json<ClearOverrideRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    if !state.role_repo.clear_override(role_id, &req).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(
        actor = %auth_context.user_id,
        role_id,
        resource_type = %req.resource_type,
        resource_id = req.resource_id,
        permission = %req.permission,
        "Permission override cleared"
    );

    Ok(Json(json!({ "cleared": true })))
}

/// 账号删除后清理角色分配，没有分配也算成功
pub async fn remove_user_roles(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.role_repo.remove_user_roles(&user_id).await?;

    tracing::info!(
        actor = %auth_context.user_id,
        user_id = %user_id,
        outcome = ?outcome,
        "User role assignments cleaned up"
    );

    Ok(Json(outcome))
}
