//! Summary lookups keyed by query string, as used by the dashboard screens.

use super::common::{empty_string_as_none, success_response};
use crate::{db::DateRange, errors::ServiceError, AppState};
use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartySummaryParams {
    #[serde(
        default,
        rename = "partyId",
        alias = "party_id",
        deserialize_with = "empty_string_as_none"
    )]
    pub party_id: Option<i32>,
    #[serde(
        default,
        rename = "startDate",
        alias = "from",
        deserialize_with = "empty_string_as_none"
    )]
    pub start_date: Option<NaiveDate>,
    #[serde(
        default,
        rename = "endDate",
        alias = "to",
        deserialize_with = "empty_string_as_none"
    )]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FactorySummaryParams {
    #[serde(
        default,
        rename = "factoryId",
        alias = "factory_id",
        deserialize_with = "empty_string_as_none"
    )]
    pub factory_id: Option<i32>,
    #[serde(
        default,
        rename = "startDate",
        alias = "from",
        deserialize_with = "empty_string_as_none"
    )]
    pub start_date: Option<NaiveDate>,
    #[serde(
        default,
        rename = "endDate",
        alias = "to",
        deserialize_with = "empty_string_as_none"
    )]
    pub end_date: Option<NaiveDate>,
}

async fn party_summary(
    State(state): State<AppState>,
    Query(params): Query<PartySummaryParams>,
) -> Result<Response, ServiceError> {
    let party_id = params
        .party_id
        .ok_or_else(|| ServiceError::missing_field("partyId"))?;
    let range = DateRange::new(params.start_date, params.end_date)?;
    let summary = state.services.summaries.party_summary(party_id, range).await?;
    Ok(success_response(summary))
}

async fn factory_summary(
    State(state): State<AppState>,
    Query(params): Query<FactorySummaryParams>,
) -> Result<Response, ServiceError> {
    let factory_id = params
        .factory_id
        .ok_or_else(|| ServiceError::missing_field("factoryId"))?;
    let range = DateRange::new(params.start_date, params.end_date)?;
    let summary = state
        .services
        .summaries
        .factory_summary(factory_id, range)
        .await?;
    Ok(success_response(summary))
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/party-summary", get(party_summary))
        .route("/factory-summary", get(factory_summary))
}
