pub mod model;
pub mod repository;
pub mod repository_sqlx;
pub mod service;

pub use model::{Good, GoodStock, Warehouse, WarehouseStock};
pub use repository::CatalogRepository;
pub use repository_sqlx::PgCatalogRepository;
pub use service::CatalogService;
