//! Document store interface and its Postgres implementation.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use fitplan_db::models::{NewPlanDocument, PlanDocument};
use fitplan_db::pool;
use fitplan_db::queries::plans as plan_queries;

/// Id-addressed storage for generated plans.
///
/// Documents are inserted once and never updated; there is no delete.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Persist a document atomically and return it with its new id.
    async fn insert(&self, new: &NewPlanDocument) -> Result<PlanDocument>;

    /// Documents ordered by `created_at` descending, after skipping `skip`.
    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<PlanDocument>>;

    /// Total number of documents.
    async fn count(&self) -> Result<i64>;

    async fn get(&self, id: Uuid) -> Result<Option<PlanDocument>>;

    /// Cheap round trip proving the store is reachable.
    async fn ping(&self) -> Result<()>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore) {}
};

/// [`PlanStore`] over the `plans` table.
#[derive(Debug, Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn insert(&self, new: &NewPlanDocument) -> Result<PlanDocument> {
        plan_queries::insert_plan(&self.pool, new).await
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<PlanDocument>> {
        plan_queries::list_plans(&self.pool, skip, limit).await
    }

    async fn count(&self) -> Result<i64> {
        plan_queries::count_plans(&self.pool).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<PlanDocument>> {
        plan_queries::get_plan(&self.pool, id).await
    }

    async fn ping(&self) -> Result<()> {
        pool::ping(&self.pool).await
    }
}
