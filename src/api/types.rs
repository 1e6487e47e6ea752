//! API request, response, and error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::AuthError;
use crate::error::GarduError;
use crate::measure::{Measurement, Month};
use crate::ops::{BulkOutcome, RowError};

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// Error returned by handlers, rendered as `{ "error": ... }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<GarduError> for ApiError {
    fn from(err: GarduError) -> Self {
        let status = match &err {
            GarduError::Validation(_) | GarduError::Import(_) => StatusCode::BAD_REQUEST,
            GarduError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => {
                error!(error = %err, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match err {
            AuthError::MissingToken | AuthError::UnknownToken => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Optional `?month=YYYY-MM`; absent means the current month.
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

impl MonthQuery {
    pub fn resolve(&self) -> Result<Month, ApiError> {
        match self.month.as_deref().map(str::trim) {
            None | Some("") => Ok(Month::current()),
            Some(raw) => Month::parse(raw).map_err(ApiError::from),
        }
    }

    /// Like [`MonthQuery::resolve`], but absent means all months.
    pub fn resolve_optional(&self) -> Result<Option<Month>, ApiError> {
        match self.month.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Month::parse(raw).map(Some).map_err(ApiError::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(rename = "schemaVersion")]
    pub schema_version: i64,
}

/// Measurement rows of one substation, split by shift.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstationMeasurements {
    pub substation_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<Month>,
    pub siang: Vec<Measurement>,
    pub malam: Vec<Measurement>,
}

/// Body of a bulk write with at least one written row.
#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub data: Vec<Measurement>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RowError>,
}

/// Body of a bulk write where nothing was written.
#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub error: String,
    pub errors: Vec<RowError>,
}

impl IntoResponse for BulkOutcome {
    fn into_response(self) -> Response {
        if self.is_failure() {
            let body = BulkFailure {
                error: "no rows were written".into(),
                errors: self.errors,
            };
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        } else {
            let body = BulkResponse {
                data: self.updated,
                errors: self.errors,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
    }
}
