use anyhow::Context;
use sqlx::PgPool;

/// Idempotent; safe to run on every start.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    // Goods
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS goods (
  id BIGINT PRIMARY KEY CHECK (id > 0),
  name TEXT NOT NULL,
  size BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await
    .context("creating goods")?;

    // Warehouses
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS warehouse (
  id BIGINT PRIMARY KEY CHECK (id > 0),
  name TEXT NOT NULL,
  is_available BOOLEAN NOT NULL DEFAULT TRUE
);
"#,
    )
    .execute(pool)
    .await
    .context("creating warehouse")?;

    // Stock ledger: one row per (good, warehouse)
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS goods_warehouse (
  good_id BIGINT NOT NULL REFERENCES goods(id) ON DELETE CASCADE,
  warehouse_id BIGINT NOT NULL REFERENCES warehouse(id) ON DELETE CASCADE,
  count BIGINT NOT NULL,
  reserved BIGINT NOT NULL DEFAULT 0,
  PRIMARY KEY (good_id, warehouse_id),
  CHECK (0 <= reserved AND reserved <= count)
);
"#,
    )
    .execute(pool)
    .await
    .context("creating goods_warehouse")?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_goods_warehouse_warehouse ON goods_warehouse(warehouse_id);"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
