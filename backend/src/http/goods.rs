use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ledger::{Pair, StockLedger};
use reservation::{BatchResult, Direction, FailedPair};
use serde::Serialize;

use super::AppState;
use super::params::{QueryMap, int_param};
use super::response::{bad_request, fail, ok};
use crate::catalog::{CatalogRepository, Good};

/// A pair that did not go through, with the reason as text.
#[derive(Debug, Serialize)]
pub struct PairError {
    pub good_id: i64,
    pub warehouse_id: i64,
    pub error: String,
}

impl From<FailedPair> for PairError {
    fn from(f: FailedPair) -> Self {
        Self {
            good_id: f.pair.good_id,
            warehouse_id: f.pair.warehouse_id,
            error: f.reason.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReservationReport {
    pub reserved: Vec<Pair>,
    pub error_reservation: Vec<PairError>,
}

impl From<BatchResult> for ReservationReport {
    fn from(r: BatchResult) -> Self {
        Self {
            reserved: r.succeeded,
            error_reservation: r.failed.into_iter().map(PairError::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReleaseReport {
    pub released: Vec<Pair>,
    pub error_release: Vec<PairError>,
}

impl From<BatchResult> for ReleaseReport {
    fn from(r: BatchResult) -> Self {
        Self {
            released: r.succeeded,
            error_release: r.failed.into_iter().map(PairError::from).collect(),
        }
    }
}

pub async fn get_good<R: CatalogRepository, L: StockLedger>(
    State(state): State<AppState<R, L>>,
    Query(query): Query<QueryMap>,
) -> Response {
    let id = match int_param(&query, "goodID") {
        Ok(id) => id,
        Err(res) => return res,
    };

    match state.catalog.get_good(id).await {
        Ok(good) => ok(good),
        Err(e) => e.into_response(),
    }
}

pub async fn create_good<R: CatalogRepository, L: StockLedger>(
    State(state): State<AppState<R, L>>,
    payload: Result<Json<Good>, JsonRejection>,
) -> Response {
    let good = match payload {
        Ok(Json(good)) => good,
        Err(e) => return bad_request(e.body_text()),
    };

    match state.catalog.create_good(&good).await {
        Ok(()) => ok(good),
        Err(e) => e.into_response(),
    }
}

pub async fn update_good<R: CatalogRepository, L: StockLedger>(
    State(state): State<AppState<R, L>>,
    payload: Result<Json<Good>, JsonRejection>,
) -> Response {
    let good = match payload {
        Ok(Json(good)) => good,
        Err(e) => return bad_request(e.body_text()),
    };

    match state.catalog.update_good(&good).await {
        Ok(()) => ok(good),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_good<R: CatalogRepository, L: StockLedger>(
    State(state): State<AppState<R, L>>,
    Query(query): Query<QueryMap>,
) -> Response {
    let id = match int_param(&query, "goodID") {
        Ok(id) => id,
        Err(res) => return res,
    };

    match state.catalog.delete_good(id).await {
        Ok(()) => ok(()),
        Err(e) => e.into_response(),
    }
}

pub async fn reserve_good<R: CatalogRepository, L: StockLedger>(
    State(state): State<AppState<R, L>>,
    payload: Result<Json<Vec<Pair>>, JsonRejection>,
) -> Response {
    let pairs = match payload {
        Ok(Json(pairs)) => pairs,
        Err(e) => return bad_request(format!("error decode request body: {}", e.body_text())),
    };

    match state
        .coordinator
        .run(Direction::Reserve, pairs, &state.shutdown)
        .await
    {
        Ok(result) => ok(ReservationReport::from(result)),
        Err(e) => {
            tracing::error!(error = %e, "reserve batch failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, format!("error reserve: {e}"))
        }
    }
}

pub async fn release_reservation_good<R: CatalogRepository, L: StockLedger>(
    State(state): State<AppState<R, L>>,
    payload: Result<Json<Vec<Pair>>, JsonRejection>,
) -> Response {
    let pairs = match payload {
        Ok(Json(pairs)) => pairs,
        Err(e) => return bad_request(format!("error decode request body: {}", e.body_text())),
    };

    match state
        .coordinator
        .run(Direction::Release, pairs, &state.shutdown)
        .await
    {
        Ok(result) => ok(ReleaseReport::from(result)),
        Err(e) => {
            tracing::error!(error = %e, "release batch failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, format!("error release: {e}"))
        }
    }
}

pub async fn add_good_on_warehouse<R: CatalogRepository, L: StockLedger>(
    State(state): State<AppState<R, L>>,
    Query(query): Query<QueryMap>,
) -> Response {
    let parsed = int_param(&query, "goodID").and_then(|good_id| {
        let warehouse_id = int_param(&query, "warehouseID")?;
        let count = int_param(&query, "count")?;
        Ok((Pair::new(good_id, warehouse_id), count))
    });
    let (pair, count) = match parsed {
        Ok(v) => v,
        Err(res) => return res,
    };

    match state.catalog.add_stock(pair, count).await {
        Ok(row) => ok(row),
        Err(e) => e.into_response(),
    }
}
