//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, put},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{
    auth::{jwt_auth_middleware, permission_guard_middleware},
    error::AppError,
    handlers,
    middleware::{request_tracking_middleware, AppState},
    services::policy::actions,
};

/// 创建应用路由
///
/// 动作没有登记权限策略时返回配置错误，启动随之失败。
pub fn create_router(state: Arc<AppState>) -> Result<Router, AppError> {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 权限查询
    let permission_routes = Router::new()
        .route(
            "/api/v1/permissions/me",
            get(handlers::permission::my_permissions),
        )
        .route(
            "/api/v1/categories/{categoryId}/permissions",
            get(handlers::permission::scoped_permissions).route_layer(from_fn_with_state(
                state.guard(actions::CATEGORY_PERMISSIONS)?,
                permission_guard_middleware,
            )),
        )
        .route(
            "/api/v1/threads/{threadId}/permissions",
            get(handlers::permission::scoped_permissions).route_layer(from_fn_with_state(
                state.guard(actions::THREAD_PERMISSIONS)?,
                permission_guard_middleware,
            )),
        )
        .route(
            "/api/v1/posts/{postId}/permissions",
            get(handlers::permission::scoped_permissions).route_layer(from_fn_with_state(
                state.guard(actions::POST_PERMISSIONS)?,
                permission_guard_middleware,
            )),
        );

    // 角色管理（需要 canAccessAdminTools 与 canEditRoles）
    let admin_routes = Router::new()
        .route("/api/v1/roles", get(handlers::role::list_roles))
        .route("/api/v1/roles/{roleId}", get(handlers::role::get_role))
        .route(
            "/api/v1/roles/{roleId}/permissions/{permission}",
            put(handlers::role::set_global_grant),
        )
        .route(
            "/api/v1/roles/{roleId}/overrides",
            get(handlers::role::list_overrides)
                .put(handlers::role::upsert_override)
                .delete(handlers::role::clear_override),
        )
        .route(
            "/api/v1/users/{userId}/roles",
            delete(handlers::role::remove_user_roles),
        )
        .route_layer(from_fn_with_state(
            state.guard(actions::ROLES_MANAGE)?,
            permission_guard_middleware,
        ));

    let authenticated_routes = Router::new()
        .merge(permission_routes)
        .merge(admin_routes)
        .layer(from_fn_with_state(
            state.jwt_service.clone(),
            jwt_auth_middleware,
        ));

    Ok(Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .layer(RequestBodyLimitLayer::new(state.config.authz.max_body_bytes))
        .layer(from_fn(request_tracking_middleware))
        .with_state(state))
}
