use async_trait::async_trait;
use ledger::{LedgerRow, Pair};

use crate::catalog::model::{Good, Warehouse};
use crate::error::CatalogError;

/// Persistence for goods, warehouses and stock intake.
///
/// Implementations report missing and duplicate records with the typed
/// `CatalogError` variants; input validation happens in the service above.
#[async_trait]
pub trait CatalogRepository: Send + Sync + 'static {
    async fn get_good(&self, id: i64) -> Result<Good, CatalogError>;

    async fn create_good(&self, good: &Good) -> Result<(), CatalogError>;

    async fn update_good(&self, good: &Good) -> Result<(), CatalogError>;

    async fn delete_good(&self, id: i64) -> Result<(), CatalogError>;

    async fn get_warehouse(&self, id: i64) -> Result<Warehouse, CatalogError>;

    async fn create_warehouse(&self, warehouse: &Warehouse) -> Result<(), CatalogError>;

    async fn update_warehouse(&self, warehouse: &Warehouse) -> Result<(), CatalogError>;

    async fn delete_warehouse(&self, id: i64) -> Result<(), CatalogError>;

    /// Creates the stock row with `count` units or adds `count` to an
    /// existing one. Both the good and the warehouse must exist.
    async fn add_stock(&self, pair: Pair, count: i64) -> Result<LedgerRow, CatalogError>;

    /// Sum of `count` over every good held in the warehouse.
    async fn count_goods(&self, warehouse_id: i64) -> Result<i64, CatalogError>;
}
