//! Request handlers for the API endpoints.
//!
//! Each handler checks the caller's role first, then runs one store
//! transaction. Path segments, query strings and bodies are taken as
//! `Result`s and unpacked after the role check, so a malformed request is
//! a JSON 400 and an anonymous one is still a 401.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::info;

use super::AppState;
use super::types::{ApiError, HealthResponse, MonthQuery, SubstationMeasurements};
use crate::auth::Role;
use crate::io::{csv_export, xlsx_export, xlsx_import};
use crate::measure::Shift;
use crate::ops::bulk::{self, BulkOutcome, WriteMode};
use crate::ops::{DashboardReport, MonthSnapshot, normalize, recompute, registry};
use crate::store::substations::{self, SubstationFilter};
use crate::store::{SCHEMA_VERSION, measurements, now_timestamp};
use crate::substation::{Substation, SubstationFields};

type ApiResult<T> = Result<T, ApiError>;

fn authorize(state: &AppState, headers: &HeaderMap, required: Role) -> ApiResult<Role> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    Ok(state.tokens.authorize(header, required)?)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

fn path_param<T>(param: Result<Path<T>, PathRejection>) -> ApiResult<T> {
    param
        .map(|Path(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query
        .map(|Query(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// `GET /api/health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        schema_version: SCHEMA_VERSION,
    })
}

/// `GET /api/substations?ulp=&status=&q=&active=`
pub async fn list_substations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    filter: Result<Query<SubstationFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<Substation>>> {
    authorize(&state, &headers, Role::Viewer)?;
    let filter = query_params(filter)?;
    let list = state.store.read(|c| substations::list(c, &filter))?;
    Ok(Json(list))
}

/// `POST /api/substations?month=` → 201 with the substation and the number
/// of placeholder rows created for `month`.
pub async fn create_substation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<MonthQuery>, QueryRejection>,
    payload: Result<Json<SubstationFields>, JsonRejection>,
) -> ApiResult<Response> {
    authorize(&state, &headers, Role::Admin)?;
    let month = query_params(query)?.resolve()?;
    let fields = json_body(payload)?;
    let now = now_timestamp();
    let created = state
        .store
        .write(|c| registry::create(c, &fields, &month, &now))?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// `GET /api/substations/{id}`
pub async fn get_substation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Substation>> {
    authorize(&state, &headers, Role::Viewer)?;
    let id = path_param(id)?;
    Ok(Json(state.store.read(|c| substations::require(c, id))?))
}

/// `PUT /api/substations/{id}`; a changed `daya` recomputes stored rows.
pub async fn update_substation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SubstationFields>, JsonRejection>,
) -> ApiResult<Response> {
    authorize(&state, &headers, Role::Admin)?;
    let id = path_param(id)?;
    let fields = json_body(payload)?;
    let now = now_timestamp();
    let updated = state
        .store
        .write(|c| registry::update(c, id, &fields, &now))?;
    Ok(Json(updated).into_response())
}

/// `DELETE /api/substations/{id}` → 204; measurement rows are deleted too.
pub async fn delete_substation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    authorize(&state, &headers, Role::Admin)?;
    let id = path_param(id)?;
    state.store.write(|c| substations::delete(c, id))?;
    info!(id, "substation deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/substations/{id}/measurements?month=`; without `month`, every
/// stored month is returned.
pub async fn substation_measurements(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> ApiResult<Json<SubstationMeasurements>> {
    authorize(&state, &headers, Role::Viewer)?;
    let id = path_param(id)?;
    let month = query_params(query)?.resolve_optional()?;
    let body = state.store.read(|c| {
        substations::require(c, id)?;
        Ok(SubstationMeasurements {
            substation_id: id,
            siang: measurements::list_for_substation(c, Shift::Siang, id, month.as_ref())?,
            malam: measurements::list_for_substation(c, Shift::Malam, id, month.as_ref())?,
            month: month.clone(),
        })
    })?;
    Ok(Json(body))
}

async fn bulk_write(
    state: Arc<AppState>,
    headers: HeaderMap,
    shift: String,
    payload: Result<Json<Value>, JsonRejection>,
    mode: WriteMode,
) -> ApiResult<BulkOutcome> {
    authorize(&state, &headers, Role::Petugas)?;
    let shift: Shift = shift.parse()?;
    let Value::Array(rows) = json_body(payload)? else {
        return Err(ApiError::bad_request("request body must be a JSON array"));
    };
    let now = now_timestamp();
    let outcome = state
        .store
        .write(|c| bulk::apply_json_batch(c, shift, &rows, mode, &now))?;
    info!(
        %shift,
        ?mode,
        written = outcome.updated.len(),
        rejected = outcome.errors.len(),
        "bulk measurement write"
    );
    Ok(outcome)
}

/// `POST /api/measurements/{shift}`: update or insert each row by natural key.
pub async fn upsert_measurements(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(shift): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<BulkOutcome> {
    bulk_write(state, headers, shift, payload, WriteMode::Upsert).await
}

/// `PATCH /api/measurements/{shift}`: update existing rows only.
pub async fn update_measurements(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(shift): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<BulkOutcome> {
    bulk_write(state, headers, shift, payload, WriteMode::UpdateOnly).await
}

/// `POST /api/maintenance/normalize?month=`
pub async fn normalize_rows(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> ApiResult<Json<normalize::BackfillReport>> {
    authorize(&state, &headers, Role::Admin)?;
    let month = query_params(query)?.resolve()?;
    Ok(Json(state.store.write(|c| normalize::backfill_all(c, &month))?))
}

/// `POST /api/maintenance/recompute`
pub async fn recompute_rows(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<recompute::RecomputeReport>> {
    authorize(&state, &headers, Role::Admin)?;
    Ok(Json(state.store.write(recompute::recompute_all)?))
}

fn snapshot(
    state: &AppState,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> ApiResult<MonthSnapshot> {
    let month = query_params(query)?.resolve()?;
    Ok(state.store.read(|c| MonthSnapshot::load(c, &month))?)
}

/// `GET /api/dashboard?month=`
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> ApiResult<Json<DashboardReport>> {
    authorize(&state, &headers, Role::Viewer)?;
    let snap = snapshot(&state, query)?;
    Ok(Json(DashboardReport::from_snapshot(
        &snap,
        &state.config.thresholds,
    )))
}

fn attachment(content_type: &'static str, file_name: String, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// `GET /api/export.xlsx?month=`
pub async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> ApiResult<Response> {
    authorize(&state, &headers, Role::Viewer)?;
    let snap = snapshot(&state, query)?;
    let bytes = xlsx_export::export_xlsx(&snap)?;
    Ok(attachment(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        format!("gardu-{}.xlsx", snap.month),
        bytes,
    ))
}

/// `GET /api/export.csv?month=`
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<MonthQuery>, QueryRejection>,
) -> ApiResult<Response> {
    authorize(&state, &headers, Role::Viewer)?;
    let snap = snapshot(&state, query)?;
    let mut buf = Vec::new();
    csv_export::write_csv(&snap, &mut buf)?;
    Ok(attachment(
        "text/csv; charset=utf-8",
        format!("gardu-{}.csv", snap.month),
        buf,
    ))
}

/// `POST /api/import?month=` with the raw xlsx file as the body.
pub async fn import_xlsx(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<MonthQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<xlsx_import::ImportReport>> {
    authorize(&state, &headers, Role::Admin)?;
    let month = query_params(query)?.resolve()?;
    let body = body.map_err(|e| ApiError {
        status: e.status(),
        message: e.body_text(),
    })?;
    if body.is_empty() {
        return Err(ApiError::bad_request("request body must be an xlsx file"));
    }
    let now = now_timestamp();
    let report = state
        .store
        .write(|c| xlsx_import::import_xlsx(c, &body, &month, &now))?;
    Ok(Json(report))
}
