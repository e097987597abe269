use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use ledger::StockLedger;
use serde::Serialize;

use super::AppState;
use super::params::{QueryMap, int_param};
use super::response::{bad_request, ok};
use crate::catalog::{CatalogRepository, Warehouse};

#[derive(Debug, Serialize)]
pub struct GoodsCount {
    pub count: i64,
}

pub async fn get_warehouse<R: CatalogRepository, L: StockLedger>(
    State(state): State<AppState<R, L>>,
    Query(query): Query<QueryMap>,
) -> Response {
    let id = match int_param(&query, "warehouseID") {
        Ok(id) => id,
        Err(res) => return res,
    };

    match state.catalog.get_warehouse(id).await {
        Ok(warehouse) => ok(warehouse),
        Err(e) => e.into_response(),
    }
}

pub async fn create_warehouse<R: CatalogRepository, L: StockLedger>(
    State(state): State<AppState<R, L>>,
    payload: Result<Json<Warehouse>, JsonRejection>,
) -> Response {
    let warehouse = match payload {
        Ok(Json(w)) => w,
        Err(e) => return bad_request(e.body_text()),
    };

    match state.catalog.create_warehouse(&warehouse).await {
        Ok(()) => ok(warehouse),
        Err(e) => e.into_response(),
    }
}

pub async fn update_warehouse<R: CatalogRepository, L: StockLedger>(
    State(state): State<AppState<R, L>>,
    payload: Result<Json<Warehouse>, JsonRejection>,
) -> Response {
    let warehouse = match payload {
        Ok(Json(w)) => w,
        Err(e) => return bad_request(e.body_text()),
    };

    match state.catalog.update_warehouse(&warehouse).await {
        Ok(()) => ok(warehouse),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_warehouse<R: CatalogRepository, L: StockLedger>(
    State(state): State<AppState<R, L>>,
    Query(query): Query<QueryMap>,
) -> Response {
    let id = match int_param(&query, "warehouseID") {
        Ok(id) => id,
        Err(res) => return res,
    };

    match state.catalog.delete_warehouse(id).await {
        Ok(()) => ok(()),
        Err(e) => e.into_response(),
    }
}

pub async fn get_count_goods<R: CatalogRepository, L: StockLedger>(
    State(state): State<AppState<R, L>>,
    Query(query): Query<QueryMap>,
) -> Response {
    let id = match int_param(&query, "warehouseID") {
        Ok(id) => id,
        Err(res) => return res,
    };

    match state.catalog.count_goods(id).await {
        Ok(count) => ok(GoodsCount { count }),
        Err(e) => e.into_response(),
    }
}
