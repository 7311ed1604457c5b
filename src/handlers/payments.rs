use super::common::{created_response, success_response, DateRangeParams};
use crate::{
    errors::ServiceError,
    services::payments::{RecordFactoryPayment, RecordPartyPayment},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};

async fn record_party_payment(
    State(state): State<AppState>,
    Json(input): Json<RecordPartyPayment>,
) -> Result<Response, ServiceError> {
    let payment = state.services.payments.record_party_payment(input).await?;
    Ok(created_response(payment))
}

async fn record_factory_payment(
    State(state): State<AppState>,
    Json(input): Json<RecordFactoryPayment>,
) -> Result<Response, ServiceError> {
    let payment = state.services.payments.record_factory_payment(input).await?;
    Ok(created_response(payment))
}

async fn list_party_payments(
    State(state): State<AppState>,
    Path(party_id): Path<i32>,
    Query(params): Query<DateRangeParams>,
) -> Result<Response, ServiceError> {
    let rows = state
        .services
        .payments
        .party_payments(party_id, params.into_range()?)
        .await?;
    Ok(success_response(rows))
}

async fn list_factory_payments(
    State(state): State<AppState>,
    Path(factory_id): Path<i32>,
    Query(params): Query<DateRangeParams>,
) -> Result<Response, ServiceError> {
    let rows = state
        .services
        .payments
        .factory_payments(factory_id, params.into_range()?)
        .await?;
    Ok(success_response(rows))
}

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/party", post(record_party_payment))
        .route("/factory", post(record_factory_payment))
        .route("/party/:id", get(list_party_payments))
        .route("/factory/:id", get(list_factory_payments))
}
