//! Database query functions for the `plans` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewPlanDocument, PlanDocument};

/// Insert a new plan row in a single statement. Returns the stored row with
/// its server-generated id.
pub async fn insert_plan(pool: &PgPool, new: &NewPlanDocument) -> Result<PlanDocument> {
    let plan = sqlx::query_as::<_, PlanDocument>(
        "INSERT INTO plans (present_weight, expected_weight, target_months, plan, created_at) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(new.present_weight)
    .bind(new.expected_weight)
    .bind(new.target_months)
    .bind(&new.plan)
    .bind(new.created_at)
    .fetch_one(pool)
    .await
    .context("failed to insert plan")?;

    Ok(plan)
}

/// Fetch a plan by its ID.
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<PlanDocument>> {
    let plan = sqlx::query_as::<_, PlanDocument>("SELECT * FROM plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}

/// List one page of plans, newest first.
pub async fn list_plans(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<PlanDocument>> {
    let plans = sqlx::query_as::<_, PlanDocument>(
        "SELECT * FROM plans ORDER BY created_at DESC OFFSET $1 LIMIT $2",
    )
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list plans")?;

    Ok(plans)
}

/// Total number of stored plans.
pub async fn count_plans(pool: &PgPool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM plans")
        .fetch_one(pool)
        .await
        .context("failed to count plans")?;

    Ok(row.0)
}
