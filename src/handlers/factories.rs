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

async fn create_factory(
    State(state): State<AppState>,
    Json(input): Json<CounterpartyInput>,
) -> Result<Response, ServiceError> {
    let factory = state.services.factories.create(input).await?;
    Ok(created_response(factory))
}

async fn list_factories(
    State(state): State<AppState>,
    Query(filter): Query<NameFilter>,
) -> Result<Response, ServiceError> {
    let factories = state.services.factories.list(filter.name.as_deref()).await?;
    Ok(success_response(factories))
}

async fn get_factory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    Ok(success_response(state.services.factories.get(id).await?))
}

async fn update_factory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<CounterpartyInput>,
) -> Result<Response, ServiceError> {
    let factory = state.services.factories.update(id, input).await?;
    Ok(success_response(factory))
}

async fn delete_factory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    state.services.factories.delete(id).await?;
    Ok(no_content_response())
}

async fn factory_summary(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(params): Query<DateRangeParams>,
) -> Result<Response, ServiceError> {
    let summary = state
        .services
        .summaries
        .factory_summary(id, params.into_range()?)
        .await?;
    Ok(success_response(summary))
}

async fn validate_factory_gstin(
    State(state): State<AppState>,
    Json(request): Json<GstinRequest>,
) -> Result<Response, ServiceError> {
    let gstin = request.gstin.unwrap_or_default();
    Ok(success_response(state.services.gstin.verify(&gstin).await?))
}

pub fn factory_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_factory).get(list_factories))
        .route("/validate-gstin", post(validate_factory_gstin))
        .route(
            "/:id",
            get(get_factory).put(update_factory).delete(delete_factory),
        )
        .route("/:id/summary", get(factory_summary))
}
