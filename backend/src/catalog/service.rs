use std::sync::Arc;
use std::time::Duration;

use common::logger::warn_if_slow;
use ledger::{LedgerRow, Pair};

use crate::catalog::model::{Good, Warehouse};
use crate::catalog::repository::CatalogRepository;
use crate::error::CatalogError;

const SLOW_READ: Duration = Duration::from_millis(100);
const SLOW_WRITE: Duration = Duration::from_millis(200);

/// Validates catalog input before it reaches the repository.
pub struct CatalogService<R: CatalogRepository> {
    repo: Arc<R>,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn get_good(&self, id: i64) -> Result<Good, CatalogError> {
        good_id(id)?;
        warn_if_slow("db_get_good", SLOW_READ, self.repo.get_good(id)).await
    }

    pub async fn create_good(&self, good: &Good) -> Result<(), CatalogError> {
        if !good.is_valid() {
            return Err(CatalogError::InvalidGood);
        }
        self.repo.create_good(good).await
    }

    pub async fn update_good(&self, good: &Good) -> Result<(), CatalogError> {
        if !good.is_valid() {
            return Err(CatalogError::InvalidGood);
        }
        self.repo.update_good(good).await
    }

    pub async fn delete_good(&self, id: i64) -> Result<(), CatalogError> {
        good_id(id)?;
        self.repo.delete_good(id).await
    }

    pub async fn get_warehouse(&self, id: i64) -> Result<Warehouse, CatalogError> {
        warehouse_id(id)?;
        warn_if_slow("db_get_warehouse", SLOW_READ, self.repo.get_warehouse(id)).await
    }

    pub async fn create_warehouse(&self, warehouse: &Warehouse) -> Result<(), CatalogError> {
        if !warehouse.is_valid() {
            return Err(CatalogError::InvalidWarehouse);
        }
        self.repo.create_warehouse(warehouse).await
    }

    pub async fn update_warehouse(&self, warehouse: &Warehouse) -> Result<(), CatalogError> {
        if !warehouse.is_valid() {
            return Err(CatalogError::InvalidWarehouse);
        }
        self.repo.update_warehouse(warehouse).await
    }

    pub async fn delete_warehouse(&self, id: i64) -> Result<(), CatalogError> {
        warehouse_id(id)?;
        self.repo.delete_warehouse(id).await
    }

    pub async fn add_stock(&self, pair: Pair, count: i64) -> Result<LedgerRow, CatalogError> {
        good_id(pair.good_id)?;
        warehouse_id(pair.warehouse_id)?;
        if count <= 0 {
            return Err(CatalogError::InvalidCount);
        }
        warn_if_slow("db_add_stock", SLOW_WRITE, self.repo.add_stock(pair, count)).await
    }

    pub async fn count_goods(&self, id: i64) -> Result<i64, CatalogError> {
        warehouse_id(id)?;
        warn_if_slow("db_count_goods", SLOW_READ, self.repo.count_goods(id)).await
    }
}

fn good_id(id: i64) -> Result<(), CatalogError> {
    if id > 0 {
        Ok(())
    } else {
        Err(CatalogError::InvalidGoodId)
    }
}

fn warehouse_id(id: i64) -> Result<(), CatalogError> {
    if id > 0 {
        Ok(())
    } else {
        Err(CatalogError::InvalidWarehouseId)
    }
}
