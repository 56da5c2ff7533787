//! Thread / post parent lookups

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::AppError, models::permission::ResourceId, services::resolver::EntityLookup,
};

pub struct EntityRepository {
    db: PgPool,
}

impl EntityRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntityLookup for EntityRepository {
    async fn thread_category_id(
        &self,
        thread_id: ResourceId,
    ) -> Result<Option<ResourceId>, AppError> {
        let category_id = sqlx::query_scalar::<_, ResourceId>(
            "SELECT category_id FROM forum_threads WHERE id = $1",
        )
        .bind(thread_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(category_id)
    }

    async fn post_thread_id(&self, post_id: ResourceId) -> Result<Option<ResourceId>, AppError> {
        let thread_id = sqlx::query_scalar::<_, ResourceId>(
            "SELECT thread_id FROM forum_posts WHERE id = $1",
        )
        .bind(post_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(thread_id)
    }
}
