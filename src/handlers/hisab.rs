use super::common::{empty_string_as_none, success_response};
use crate::{db::DateRange, errors::ServiceError, services::hisab::HisabQuery, AppState};
use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HisabParams {
    #[serde(
        default,
        rename = "partyId",
        alias = "party_id",
        deserialize_with = "empty_string_as_none"
    )]
    pub party_id: Option<i32>,
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

impl TryFrom<HisabParams> for HisabQuery {
    type Error = ServiceError;

    fn try_from(params: HisabParams) -> Result<Self, Self::Error> {
        Ok(HisabQuery {
            party_id: params.party_id,
            factory_id: params.factory_id,
            range: DateRange::new(params.start_date, params.end_date)?,
        })
    }
}

async fn get_hisab(
    State(state): State<AppState>,
    Query(params): Query<HisabParams>,
) -> Result<Response, ServiceError> {
    let report = state.services.hisab.get(params.try_into()?).await?;
    Ok(success_response(report))
}

async fn get_intersection(
    State(state): State<AppState>,
    Query(params): Query<HisabParams>,
) -> Result<Response, ServiceError> {
    let intersection = state.services.hisab.intersection(params.try_into()?).await?;
    Ok(success_response(intersection))
}

pub fn hisab_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_hisab))
        .route("/intersection", get(get_intersection))
}
