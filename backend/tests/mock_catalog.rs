use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use backend::catalog::{CatalogRepository, Good, GoodStock, Warehouse, WarehouseStock};
use backend::error::CatalogError;
use ledger::{LedgerRow, MemoryStockLedger, Pair};

/// Catalog kept in maps, with stock rows living in the shared memory ledger
/// so reservations made through the coordinator show up in reads.
pub struct InMemoryCatalog {
    pub goods: Mutex<BTreeMap<i64, Good>>,
    pub warehouses: Mutex<BTreeMap<i64, Warehouse>>,
    pub ledger: Arc<MemoryStockLedger>,
}

impl InMemoryCatalog {
    pub fn new(ledger: Arc<MemoryStockLedger>) -> Self {
        Self {
            goods: Mutex::new(BTreeMap::new()),
            warehouses: Mutex::new(BTreeMap::new()),
            ledger,
        }
    }

    /// Rows whose good and warehouse both still exist.
    async fn live_rows(&self) -> Vec<LedgerRow> {
        let rows = self.ledger.rows().await;
        let goods = self.goods.lock().await;
        let warehouses = self.warehouses.lock().await;
        rows.into_iter()
            .filter(|r| goods.contains_key(&r.good_id) && warehouses.contains_key(&r.warehouse_id))
            .collect()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn get_good(&self, id: i64) -> Result<Good, CatalogError> {
        let rows = self.live_rows().await;
        let mut good = self
            .goods
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(CatalogError::GoodNotFound(id))?;

        let warehouses = self.warehouses.lock().await;
        good.warehouses = rows
            .iter()
            .filter(|r| r.good_id == id)
            .filter_map(|r| {
                let w = warehouses.get(&r.warehouse_id)?;
                Some(GoodStock {
                    warehouse_id: w.id,
                    name: w.name.clone(),
                    is_available: w.is_available,
                    count: r.count,
                    reserved: r.reserved,
                })
            })
            .collect();
        Ok(good)
    }

    async fn create_good(&self, good: &Good) -> Result<(), CatalogError> {
        let mut goods = self.goods.lock().await;
        if goods.contains_key(&good.id) {
            return Err(CatalogError::GoodExists(good.id));
        }
        goods.insert(good.id, Good::new(good.id, good.name.clone(), good.size));
        Ok(())
    }

    async fn update_good(&self, good: &Good) -> Result<(), CatalogError> {
        let mut goods = self.goods.lock().await;
        let Some(slot) = goods.get_mut(&good.id) else {
            return Err(CatalogError::GoodNotFound(good.id));
        };
        *slot = Good::new(good.id, good.name.clone(), good.size);
        Ok(())
    }

    async fn delete_good(&self, id: i64) -> Result<(), CatalogError> {
        self.goods
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(CatalogError::GoodNotFound(id))
    }

    async fn get_warehouse(&self, id: i64) -> Result<Warehouse, CatalogError> {
        let rows = self.live_rows().await;
        let mut warehouse = self
            .warehouses
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(CatalogError::WarehouseNotFound(id))?;

        let goods = self.goods.lock().await;
        warehouse.goods = rows
            .iter()
            .filter(|r| r.warehouse_id == id)
            .filter_map(|r| {
                let g = goods.get(&r.good_id)?;
                Some(WarehouseStock {
                    id: g.id,
                    name: g.name.clone(),
                    size: g.size,
                    count: r.count,
                    reserved: r.reserved,
                })
            })
            .collect();
        Ok(warehouse)
    }

    async fn create_warehouse(&self, warehouse: &Warehouse) -> Result<(), CatalogError> {
        let mut warehouses = self.warehouses.lock().await;
        if warehouses.contains_key(&warehouse.id) {
            return Err(CatalogError::WarehouseExists(warehouse.id));
        }
        warehouses.insert(
            warehouse.id,
            Warehouse::new(warehouse.id, warehouse.name.clone(), warehouse.is_available),
        );
        Ok(())
    }

    async fn update_warehouse(&self, warehouse: &Warehouse) -> Result<(), CatalogError> {
        let mut warehouses = self.warehouses.lock().await;
        let Some(slot) = warehouses.get_mut(&warehouse.id) else {
            return Err(CatalogError::WarehouseNotFound(warehouse.id));
        };
        *slot = Warehouse::new(warehouse.id, warehouse.name.clone(), warehouse.is_available);
        Ok(())
    }

    async fn delete_warehouse(&self, id: i64) -> Result<(), CatalogError> {
        self.warehouses
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(CatalogError::WarehouseNotFound(id))
    }

    async fn add_stock(&self, pair: Pair, count: i64) -> Result<LedgerRow, CatalogError> {
        if !self.goods.lock().await.contains_key(&pair.good_id) {
            return Err(CatalogError::GoodNotFound(pair.good_id));
        }
        if !self.warehouses.lock().await.contains_key(&pair.warehouse_id) {
            return Err(CatalogError::WarehouseNotFound(pair.warehouse_id));
        }
        self.ledger
            .add_stock(pair, count)
            .await
            .map_err(|e| CatalogError::Database(sqlx::Error::Protocol(e.to_string())))
    }

    async fn count_goods(&self, warehouse_id: i64) -> Result<i64, CatalogError> {
        if !self.warehouses.lock().await.contains_key(&warehouse_id) {
            return Err(CatalogError::WarehouseNotFound(warehouse_id));
        }
        Ok(self
            .live_rows()
            .await
            .iter()
            .filter(|r| r.warehouse_id == warehouse_id)
            .map(|r| r.count)
            .sum())
    }
}
