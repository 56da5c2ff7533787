//! 资源 ID 解析
//! 根据权限声明的解析策略，从路由参数、请求体或父实体中得到资源引用

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    error::AppError,
    models::{
        context::RequestContext,
        permission::{
            DenialReason, PermissionDeclaration, ResolutionStrategy, ResourceId, ResourceRef,
            ResourceType,
        },
    },
};

/// 父实体查询（只读）
#[async_trait]
pub trait EntityLookup: Send + Sync {
    /// 主题所属分类，主题不存在时返回 None
    async fn thread_category_id(
        &self,
        thread_id: ResourceId,
    ) -> Result<Option<ResourceId>, AppError>;

    /// 回复所属主题，回复不存在时返回 None
    async fn post_thread_id(&self, post_id: ResourceId) -> Result<Option<ResourceId>, AppError>;
}

/// 资源解析失败
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("resource id `{param}` is missing or malformed")]
    MissingResource { param: String },

    #[error("{resource_type} {resource_id} not found")]
    ResourceNotFound {
        resource_type: ResourceType,
        resource_id: ResourceId,
    },

    #[error("entity lookup failed: {0}")]
    Lookup(#[from] AppError),
}

impl ResolutionError {
    fn missing(param: &str) -> Self {
        ResolutionError::MissingResource {
            param: param.to_string(),
        }
    }

    fn not_found(resource_type: ResourceType, resource_id: ResourceId) -> Self {
        ResolutionError::ResourceNotFound {
            resource_type,
            resource_id,
        }
    }

    /// 用于日志的拒绝原因
    pub fn denial_reason(&self) -> DenialReason {
        match self {
            ResolutionError::MissingResource { param } => DenialReason::MissingResource {
                param: param.clone(),
            },
            ResolutionError::ResourceNotFound {
                resource_type,
                resource_id,
            } => DenialReason::ResourceNotFound {
                resource_type: *resource_type,
                resource_id: *resource_id,
            },
            ResolutionError::Lookup(_) => DenialReason::LookupFailed,
        }
    }
}

#[derive(Clone)]
pub struct ResourceResolver {
    entities: Arc<dyn EntityLookup>,
}

impl ResourceResolver {
    pub fn new(entities: Arc<dyn EntityLookup>) -> Self {
        Self { entities }
    }

    /// 解析声明对应的资源引用
    pub async fn resolve(
        &self,
        declaration: &PermissionDeclaration,
        ctx: &RequestContext,
    ) -> Result<ResourceRef, ResolutionError> {
        match (declaration.resource_type(), declaration.strategy()) {
            (Some(resource_type), ResolutionStrategy::RouteParam(name)) => {
                let id = route_id(ctx, name)?;
                Ok(ResourceRef::scoped(resource_type, id))
            }
            (Some(resource_type), ResolutionStrategy::RequestBody(field)) => {
                let id = ctx
                    .body_field(field)
                    .and_then(parse_body_id)
                    .ok_or_else(|| ResolutionError::missing(field))?;
                Ok(ResourceRef::scoped(resource_type, id))
            }
            (Some(_), ResolutionStrategy::ParentThread(name)) => {
                let thread_id = route_id(ctx, name)?;
                let category_id = self.category_of_thread(thread_id).await?;
                Ok(ResourceRef::scoped(ResourceType::Category, category_id))
            }
            (Some(resource_type), ResolutionStrategy::ParentPost(name)) => {
                let post_id = route_id(ctx, name)?;
                let thread_id = self
                    .entities
                    .post_thread_id(post_id)
                    .await?
                    .ok_or_else(|| ResolutionError::not_found(ResourceType::Post, post_id))?;

                if resource_type == ResourceType::Thread {
                    return Ok(ResourceRef::scoped(ResourceType::Thread, thread_id));
                }

                let category_id = self.category_of_thread(thread_id).await?;
                Ok(ResourceRef::scoped(ResourceType::Category, category_id))
            }
            _ => Ok(ResourceRef::Global),
        }
    }

    async fn category_of_thread(
        &self,
        thread_id: ResourceId,
    ) -> Result<ResourceId, ResolutionError> {
        let category_id = self
            .entities
            .thread_category_id(thread_id)
            .await?
            .ok_or_else(|| ResolutionError::not_found(ResourceType::Thread, thread_id))?;

        tracing::trace!(thread_id, category_id, "Resolved thread category");

        Ok(category_id)
    }
}

fn route_id(ctx: &RequestContext, name: &str) -> Result<ResourceId, ResolutionError> {
    ctx.route_param(name)
        .and_then(parse_id)
        .ok_or_else(|| ResolutionError::missing(name))
}

/// 资源 ID 必须是正整数
fn parse_id(raw: &str) -> Option<ResourceId> {
    raw.trim().parse::<ResourceId>().ok().filter(|id| *id > 0)
}

fn parse_body_id(value: &Value) -> Option<ResourceId> {
    match value {
        Value::Number(n) => n.as_i64().filter(|id| *id > 0),
        Value::String(s) => parse_id(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id(" 7 "), Some(7));
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("-3"), None);
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id(""), None);
    }

    #[test]
    fn test_parse_body_id() {
        assert_eq!(parse_body_id(&json!(5)), Some(5));
        assert_eq!(parse_body_id(&json!("5")), Some(5));
        assert_eq!(parse_body_id(&json!(5.5)), None);
        assert_eq!(parse_body_id(&json!(null)), None);
        assert_eq!(parse_body_id(&json!({ "id": 5 })), None);
    }

    #[test]
    fn test_denial_reason_mapping() {
        let err = ResolutionError::missing("categoryId");
        assert_eq!(
            err.denial_reason(),
            DenialReason::MissingResource {
                param: "categoryId".to_string()
            }
        );

        let err = ResolutionError::Lookup(AppError::Internal("timeout".to_string()));
        assert_eq!(err.denial_reason(), DenialReason::LookupFailed);
    }
}
