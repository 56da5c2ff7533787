//! 权限查询处理器
//! 前端据此决定显示哪些操作按钮

use axum::{
    extract::{Extension, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    auth::{AuthContext, AuthorizedResources},
    error::AppError,
    middleware::AppState,
    models::permission::{names, ResourceRef},
};

/// 当前用户的角色和全局权限
pub async fn my_permissions(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let roles = state
        .permission_service
        .caller_roles(&auth_context.user_id)
        .await?;

    let permissions = state
        .permission_service
        .effective_permissions(&roles, ResourceRef::Global, &names::ALL)
        .await;

    Ok(Json(json!({
        "userId": auth_context.user_id,
        "roles": roles,
        "permissions": permissions
    })))
}

/// 资源上的生效权限
///
/// 分类、主题、回复三个路由共用：守卫已解析出所属分类。
pub async fn scoped_permissions(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Extension(resources): Extension<AuthorizedResources>,
) -> Result<impl IntoResponse, AppError> {
    let (resource_type, resource_id) = resources.first_scoped().ok_or(AppError::Forbidden)?;

    let roles = state
        .permission_service
        .caller_roles(&auth_context.user_id)
        .await?;

    let permissions = state
        .permission_service
        .effective_permissions(
            &roles,
            ResourceRef::scoped(resource_type, resource_id),
            &names::CATEGORY_SCOPED,
        )
        .await;

    Ok(Json(json!({
        "resourceType": resource_type,
        "resourceId": resource_id,
        "permissions": permissions
    })))
}
