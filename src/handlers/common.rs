use crate::{db::DateRange, errors::ServiceError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Serde deserialization decorator to map empty Strings to None
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => FromStr::from_str(s).map_err(de::Error::custom).map(Some),
    }
}

/// `from`/`to` window, also accepted as `startDate`/`endDate`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeParams {
    #[serde(default, alias = "startDate", deserialize_with = "empty_string_as_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, alias = "endDate", deserialize_with = "empty_string_as_none")]
    pub to: Option<NaiveDate>,
}

impl DateRangeParams {
    pub fn into_range(self) -> Result<DateRange, ServiceError> {
        DateRange::new(self.from, self.to)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameFilter {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub name: Option<String>,
}
