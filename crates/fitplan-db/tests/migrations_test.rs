//! Integration tests for migrations, pooling and database bootstrap.
//!
//! Run against the shared PostgreSQL from `fitplan-test-utils`; every test
//! works in its own temporary database.

use uuid::Uuid;

use fitplan_db::config::DbConfig;
use fitplan_db::pool::{self, DatabaseState};
use fitplan_db::queries::plans;
use fitplan_test_utils::{create_test_db, drop_test_db, pg_url};

#[tokio::test]
async fn migrations_create_plans_table() {
    let (pool, db_name) = create_test_db().await;

    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT tablename::text FROM pg_tables \
         WHERE schemaname = 'public' AND tablename NOT LIKE '\\_sqlx%' \
         ORDER BY tablename",
    )
    .fetch_all(&pool)
    .await
    .expect("should list tables");

    let tables: Vec<&str> = rows.iter().map(|(name,)| name.as_str()).collect();
    assert_eq!(tables, ["plans"]);

    let columns: Vec<(String, String)> = sqlx::query_as(
        "SELECT column_name::text, data_type::text FROM information_schema.columns \
         WHERE table_name = 'plans' ORDER BY ordinal_position",
    )
    .fetch_all(&pool)
    .await
    .expect("should list columns");
    let columns: Vec<(&str, &str)> = columns
        .iter()
        .map(|(n, t)| (n.as_str(), t.as_str()))
        .collect();
    assert_eq!(
        columns,
        [
            ("id", "uuid"),
            ("present_weight", "double precision"),
            ("expected_weight", "double precision"),
            ("target_months", "integer"),
            ("plan", "jsonb"),
            ("created_at", "timestamp with time zone"),
        ]
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let (pool, db_name) = create_test_db().await;

    // create_test_db already ran them once.
    pool::run_migrations(&pool)
        .await
        .expect("second migration run should succeed");

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(&pool)
        .await
        .expect("should count applied migrations");
    assert_eq!(applied, pool::MIGRATOR.iter().count() as i64);
    assert_eq!(plans::count_plans(&pool).await.unwrap(), 0);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn ping_succeeds_on_live_pool() {
    let (pool, db_name) = create_test_db().await;

    pool::ping(&pool).await.expect("ping should succeed");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn ping_fails_on_closed_pool() {
    let (pool, db_name) = create_test_db().await;
    pool.close().await;

    assert!(pool::ping(&pool).await.is_err());

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn ensure_database_exists_is_idempotent() {
    let db_name = format!("fitplan_test_{}", Uuid::new_v4().simple());
    let config = DbConfig::new(format!("{}/{db_name}", pg_url().await));

    let first = pool::ensure_database_exists(&config)
        .await
        .expect("first ensure should succeed");
    assert_eq!(first, DatabaseState::Created);
    let second = pool::ensure_database_exists(&config)
        .await
        .expect("second ensure should succeed (idempotent)");
    assert_eq!(second, DatabaseState::Existing);

    let pool = pool::open_store(&config)
        .await
        .expect("created database should accept connections");
    assert_eq!(plans::count_plans(&pool).await.unwrap(), 0);
    pool.close().await;

    drop_test_db(&db_name).await;
}
