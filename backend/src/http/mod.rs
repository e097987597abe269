//! JSON-over-HTTP surface. Route names follow the public API clients
//! already use, so they are verbs rather than REST resources.
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use ledger::StockLedger;
use reservation::BatchCoordinator;
use tokio_util::sync::CancellationToken;

use crate::catalog::{CatalogRepository, CatalogService};

pub mod goods;
pub mod params;
pub mod response;
pub mod warehouses;

pub struct AppState<R: CatalogRepository, L: StockLedger> {
    pub catalog: Arc<CatalogService<R>>,
    pub coordinator: Arc<BatchCoordinator<L>>,
    /// Cancelled on shutdown; in-flight batches return what they committed.
    pub shutdown: CancellationToken,
}

impl<R: CatalogRepository, L: StockLedger> AppState<R, L> {
    pub fn new(
        catalog: Arc<CatalogService<R>>,
        coordinator: Arc<BatchCoordinator<L>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            catalog,
            coordinator,
            shutdown,
        }
    }
}

// derive(Clone) would demand R: Clone and L: Clone
impl<R: CatalogRepository, L: StockLedger> Clone for AppState<R, L> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            coordinator: Arc::clone(&self.coordinator),
            shutdown: self.shutdown.clone(),
        }
    }
}

pub fn router<R, L>(state: AppState<R, L>) -> Router
where
    R: CatalogRepository,
    L: StockLedger,
{
    Router::new()
        .route("/getGood", get(goods::get_good::<R, L>))
        .route("/createGood", post(goods::create_good::<R, L>))
        .route("/updateGood", put(goods::update_good::<R, L>))
        .route("/deleteGood", delete(goods::delete_good::<R, L>))
        .route("/reserveGood", patch(goods::reserve_good::<R, L>))
        .route(
            "/releaseReservationGood",
            patch(goods::release_reservation_good::<R, L>),
        )
        .route(
            "/addGoodOnWarehouse",
            post(goods::add_good_on_warehouse::<R, L>),
        )
        .route("/getWarehouse", get(warehouses::get_warehouse::<R, L>))
        .route("/createWarehouse", post(warehouses::create_warehouse::<R, L>))
        .route("/updateWarehouse", put(warehouses::update_warehouse::<R, L>))
        .route("/deleteWarehouse", delete(warehouses::delete_warehouse::<R, L>))
        .route("/getCountGoods", get(warehouses::get_count_goods::<R, L>))
        .with_state(state)
}
