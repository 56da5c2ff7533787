//! 权限守卫中间件
//! 在 handler 执行前评估动作上登记的全部权限声明

use axum::{
    body::Body,
    extract::{FromRequestParts, Path, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    models::{
        context::RequestContext,
        permission::{PermissionDeclaration, ResourceId, ResourceRef, ResourceType},
    },
    services::PermissionService,
};

/// 单个动作的守卫状态
#[derive(Clone)]
pub struct PermissionGuard {
    service: Arc<PermissionService>,
    action: Arc<str>,
    declarations: Arc<[PermissionDeclaration]>,
    max_body_bytes: usize,
}

impl PermissionGuard {
    pub fn new(
        service: Arc<PermissionService>,
        action: &str,
        declarations: Arc<[PermissionDeclaration]>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            service,
            action: Arc::from(action),
            declarations,
            max_body_bytes,
        }
    }

    fn reads_body(&self) -> bool {
        self.declarations.iter().any(|d| d.strategy().reads_body())
    }
}

/// 授权通过后解析出的资源，顺序与声明一致
#[derive(Debug, Clone, Default)]
pub struct AuthorizedResources(pub Vec<ResourceRef>);

impl AuthorizedResources {
    /// 第一个带资源的引用
    pub fn first_scoped(&self) -> Option<(ResourceType, ResourceId)> {
        self.0.iter().find_map(|r| match *r {
            ResourceRef::Scoped {
                resource_type,
                resource_id,
            } => Some((resource_type, resource_id)),
            ResourceRef::Global => None,
        })
    }
}

/// 权限守卫，需挂在 jwt_auth_middleware 之内
///
/// 所有拒绝（无权限、资源不存在、查询失败）都返回同样的 403。
pub async fn permission_guard_middleware(
    State(guard): State<PermissionGuard>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let auth = AuthContext::from_request_parts(&mut parts, &()).await?;

    let route_params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
        .await
        .map(|Path(params)| params)
        .unwrap_or_default();

    // 只有声明需要时才读取请求体，读取后原样放回
    let (body, json) = if guard.reads_body() {
        match axum::body::to_bytes(body, guard.max_body_bytes).await {
            Ok(bytes) => {
                let json = serde_json::from_slice(&bytes).ok();
                (Body::from(bytes), json)
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %auth.user_id,
                    action = %guard.action,
                    error = %e,
                    "Failed to read request body for authorization"
                );
                return Err(AppError::Forbidden);
            }
        }
    } else {
        (body, None)
    };

    let roles = match guard.service.caller_roles(&auth.user_id).await {
        Ok(roles) => roles,
        Err(e) => {
            tracing::warn!(
                user_id = %auth.user_id,
                action = %guard.action,
                error = %e,
                "Failed to load caller roles"
            );
            return Err(AppError::Forbidden);
        }
    };

    let ctx = RequestContext::new(route_params, json);

    match guard
        .service
        .authorize_all(&roles, &guard.declarations, &ctx)
        .await
    {
        Ok(resources) => {
            let mut req = Request::from_parts(parts, body);
            req.extensions_mut().insert(AuthorizedResources(resources));
            Ok(next.run(req).await)
        }
        Err(decision) => {
            tracing::warn!(
                user_id = %auth.user_id,
                action = %guard.action,
                permission = %decision.permission,
                reason = ?decision.denial,
                "Action forbidden"
            );
            Err(AppError::Forbidden)
        }
    }
}
