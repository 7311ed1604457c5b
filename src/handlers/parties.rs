use super::common::{
    created_response, no_content_response, success_response, DateRangeParams, NameFilter,
};
use crate::{
    errors::ServiceError,
    services::{counterparties::CounterpartyInput, gstin::GstinRequest},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};

async fn create_party(
    State(state): State<AppState>,
    Json(input): Json<CounterpartyInput>,
) -> Result<Response, ServiceError> {
    let party = state.services.parties.create(input).await?;
    Ok(created_response(party))
}

async fn list_parties(
    State(state): State<AppState>,
    Query(filter): Query<NameFilter>,
) -> Result<Response, ServiceError> {
    let parties = state.services.parties.list(filter.name.as_deref()).await?;
    Ok(success_response(parties))
}

async fn get_party(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    Ok(success_response(state.services.parties.get(id).await?))
}

async fn update_party(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<CounterpartyInput>,
) -> Result<Response, ServiceError> {
    let party = state.services.parties.update(id, input).await?;
    Ok(success_response(party))
}

async fn delete_party(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    state.services.parties.delete(id).await?;
    Ok(no_content_response())
}

async fn party_summary(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(params): Query<DateRangeParams>,
) -> Result<Response, ServiceError> {
    let summary = state
        .services
        .summaries
        .party_summary(id, params.into_range()?)
        .await?;
    Ok(success_response(summary))
}

async fn validate_party_gstin(
    State(state): State<AppState>,
    Json(request): Json<GstinRequest>,
) -> Result<Response, ServiceError> {
    let gstin = request.gstin.unwrap_or_default();
    Ok(success_response(state.services.gstin.verify(&gstin).await?))
}

pub fn party_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_party).get(list_parties))
        .route("/validate-gstin", post(validate_party_gstin))
        .route(
            "/:id",
            get(get_party).put(update_party).delete(delete_party),
        )
        .route("/:id/summary", get(party_summary))
}
