use thiserror::Error;

/// Failures of catalog operations (goods, warehouses, stock intake).
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("good id is not positive")]
    InvalidGoodId,

    #[error("warehouse id is not positive")]
    InvalidWarehouseId,

    #[error("count is not positive")]
    InvalidCount,

    #[error("good is invalid: id must be positive, name non-empty, size non-zero")]
    InvalidGood,

    #[error("warehouse is invalid: id must be positive, name non-empty")]
    InvalidWarehouse,

    #[error("good with id {0} is not found")]
    GoodNotFound(i64),

    #[error("warehouse with id {0} is not found")]
    WarehouseNotFound(i64),

    #[error("good with id {0} already exists")]
    GoodExists(i64),

    #[error("warehouse with id {0} already exists")]
    WarehouseExists(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CatalogError {
    /// Caller mistakes, as opposed to conflicts and infrastructure failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            CatalogError::GoodExists(_) | CatalogError::WarehouseExists(_) | CatalogError::Database(_)
        )
    }
}
