use super::common::{created_response, success_response, DateRangeParams};
use crate::{errors::ServiceError, services::transactions::RecordTransaction, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};

async fn record_transaction(
    State(state): State<AppState>,
    Json(input): Json<RecordTransaction>,
) -> Result<Response, ServiceError> {
    let recorded = state.services.transactions.record(input).await?;
    Ok(created_response(recorded))
}

async fn list_party_transactions(
    State(state): State<AppState>,
    Path(party_id): Path<i32>,
    Query(params): Query<DateRangeParams>,
) -> Result<Response, ServiceError> {
    let rows = state
        .services
        .transactions
        .party_transactions(party_id, params.into_range()?)
        .await?;
    Ok(success_response(rows))
}

async fn list_factory_transactions(
    State(state): State<AppState>,
    Path(factory_id): Path<i32>,
    Query(params): Query<DateRangeParams>,
) -> Result<Response, ServiceError> {
    let rows = state
        .services
        .transactions
        .factory_transactions(factory_id, params.into_range()?)
        .await?;
    Ok(success_response(rows))
}

pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(record_transaction))
        .route("/party/:id", get(list_party_transactions))
        .route("/factory/:id", get(list_factory_transactions))
}
