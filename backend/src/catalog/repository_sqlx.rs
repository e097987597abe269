use async_trait::async_trait;
use ledger::{LedgerRow, Pair};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::catalog::model::{Good, GoodStock, Warehouse, WarehouseStock};
use crate::catalog::repository::CatalogRepository;
use crate::error::CatalogError;

/// SQLx-backed implementation of CatalogRepository.
/// Responsible only for persistence and row mapping.
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn good_exists(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<bool, sqlx::Error> {
        let found = sqlx::query("SELECT 1 FROM goods WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(found.is_some())
    }

    async fn warehouse_exists(
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> Result<bool, sqlx::Error> {
        let found = sqlx::query("SELECT 1 FROM warehouse WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn get_good(&self, id: i64) -> Result<Good, CatalogError> {
        let Some(row) = sqlx::query("SELECT id, name, size FROM goods WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Err(CatalogError::GoodNotFound(id));
        };

        let stock = sqlx::query(
            r#"
SELECT gw.warehouse_id, w.name, w.is_available, gw.count, gw.reserved
FROM goods_warehouse gw
INNER JOIN warehouse w ON w.id = gw.warehouse_id
WHERE gw.good_id = $1
ORDER BY gw.warehouse_id;
"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Good {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            size: row.try_get("size")?,
            warehouses: stock
                .iter()
                .map(row_to_good_stock)
                .collect::<Result<_, _>>()?,
        })
    }

    async fn create_good(&self, good: &Good) -> Result<(), CatalogError> {
        let res = sqlx::query(
            "INSERT INTO goods (id, name, size) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING",
        )
        .bind(good.id)
        .bind(&good.name)
        .bind(good.size)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Err(CatalogError::GoodExists(good.id));
        }
        Ok(())
    }

    async fn update_good(&self, good: &Good) -> Result<(), CatalogError> {
        let res = sqlx::query("UPDATE goods SET name = $1, size = $2 WHERE id = $3")
            .bind(&good.name)
            .bind(good.size)
            .bind(good.id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(CatalogError::GoodNotFound(good.id));
        }
        Ok(())
    }

    async fn delete_good(&self, id: i64) -> Result<(), CatalogError> {
        let res = sqlx::query("DELETE FROM goods WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(CatalogError::GoodNotFound(id));
        }
        Ok(())
    }

    async fn get_warehouse(&self, id: i64) -> Result<Warehouse, CatalogError> {
        let Some(row) = sqlx::query("SELECT id, name, is_available FROM warehouse WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Err(CatalogError::WarehouseNotFound(id));
        };

        let stock = sqlx::query(
            r#"
SELECT g.id, g.name, g.size, gw.count, gw.reserved
FROM goods_warehouse gw
INNER JOIN goods g ON g.id = gw.good_id
WHERE gw.warehouse_id = $1
ORDER BY g.id;
"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Warehouse {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            is_available: row.try_get("is_available")?,
            goods: stock
                .iter()
                .map(row_to_warehouse_stock)
                .collect::<Result<_, _>>()?,
        })
    }

    async fn create_warehouse(&self, warehouse: &Warehouse) -> Result<(), CatalogError> {
        let res = sqlx::query(
            r#"
INSERT INTO warehouse (id, name, is_available) VALUES ($1, $2, $3)
ON CONFLICT (id) DO NOTHING
"#,
        )
        .bind(warehouse.id)
        .bind(&warehouse.name)
        .bind(warehouse.is_available)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Err(CatalogError::WarehouseExists(warehouse.id));
        }
        Ok(())
    }

    async fn update_warehouse(&self, warehouse: &Warehouse) -> Result<(), CatalogError> {
        let res = sqlx::query("UPDATE warehouse SET name = $1, is_available = $2 WHERE id = $3")
            .bind(&warehouse.name)
            .bind(warehouse.is_available)
            .bind(warehouse.id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(CatalogError::WarehouseNotFound(warehouse.id));
        }
        Ok(())
    }

    async fn delete_warehouse(&self, id: i64) -> Result<(), CatalogError> {
        let res = sqlx::query("DELETE FROM warehouse WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(CatalogError::WarehouseNotFound(id));
        }
        Ok(())
    }

    async fn add_stock(&self, pair: Pair, count: i64) -> Result<LedgerRow, CatalogError> {
        let mut tx = self.pool.begin().await?;

        if !Self::good_exists(&mut tx, pair.good_id).await? {
            return Err(CatalogError::GoodNotFound(pair.good_id));
        }
        if !Self::warehouse_exists(&mut tx, pair.warehouse_id).await? {
            return Err(CatalogError::WarehouseNotFound(pair.warehouse_id));
        }

        // an existing row keeps its reservations; only the count grows
        let row = sqlx::query(
            r#"
INSERT INTO goods_warehouse (good_id, warehouse_id, count, reserved)
VALUES ($1, $2, $3, 0)
ON CONFLICT (good_id, warehouse_id)
DO UPDATE SET count = goods_warehouse.count + EXCLUDED.count
RETURNING good_id, warehouse_id, count, reserved;
"#,
        )
        .bind(pair.good_id)
        .bind(pair.warehouse_id)
        .bind(count)
        .fetch_one(&mut *tx)
        .await?;

        let row = LedgerRow {
            good_id: row.try_get("good_id")?,
            warehouse_id: row.try_get("warehouse_id")?,
            count: row.try_get("count")?,
            reserved: row.try_get("reserved")?,
        };
        tx.commit().await?;

        tracing::debug!(%pair, count = row.count, reserved = row.reserved, "stock added");
        Ok(row)
    }

    async fn count_goods(&self, warehouse_id: i64) -> Result<i64, CatalogError> {
        let mut tx = self.pool.begin().await?;

        if !Self::warehouse_exists(&mut tx, warehouse_id).await? {
            return Err(CatalogError::WarehouseNotFound(warehouse_id));
        }

        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(count), 0)::BIGINT FROM goods_warehouse WHERE warehouse_id = $1",
        )
        .bind(warehouse_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(total)
    }
}

/* =========================
Row mapping
========================= */

fn row_to_good_stock(r: &PgRow) -> Result<GoodStock, sqlx::Error> {
    Ok(GoodStock {
        warehouse_id: r.try_get("warehouse_id")?,
        name: r.try_get("name")?,
        is_available: r.try_get("is_available")?,
        count: r.try_get("count")?,
        reserved: r.try_get("reserved")?,
    })
}

fn row_to_warehouse_stock(r: &PgRow) -> Result<WarehouseStock, sqlx::Error> {
    Ok(WarehouseStock {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        size: r.try_get("size")?,
        count: r.try_get("count")?,
        reserved: r.try_get("reserved")?,
    })
}
