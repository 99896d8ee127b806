//! REST API handlers for the scan dashboard
//!
//! These handlers use the shared DashboardService.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::service::{DashboardService, DEFAULT_SESSION};
use crate::dashboard::{DashboardView, GroupReport};
use crate::error::PipelineError;
use crate::models::ShiftWindow;
use crate::session::FilterUpdate;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct DatasetResponse {
    pub dataset_id: String,
    pub total_rows: usize,
    pub records: usize,
    pub dropped_rows: usize,
    pub operators: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct ShiftResponse {
    pub name: &'static str,
    pub key: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: PipelineError) -> ApiError {
    let status = match &e {
        PipelineError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
        PipelineError::UnknownDataset(_) => StatusCode::NOT_FOUND,
        e if e.is_bad_input() => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Deserialize, Default)]
pub struct ViewQuery {
    pub session: Option<String>,
    pub dataset: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub shift: Option<String>,
}

impl ViewQuery {
    fn session_name(&self) -> &str {
        self.session.as_deref().unwrap_or(DEFAULT_SESSION)
    }

    fn filter_update(&self) -> Result<FilterUpdate, PipelineError> {
        let shift = self
            .shift
            .as_deref()
            .map(str::parse::<ShiftWindow>)
            .transpose()
            .map_err(PipelineError::InvalidFilter)?;
        Ok(FilterUpdate {
            start: self.start,
            end: self.end,
            shift,
        })
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub type AppState = Arc<DashboardService>;

/// GET /api/v1/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/v1/shifts
pub async fn get_shifts() -> Json<Vec<ShiftResponse>> {
    Json(
        ShiftWindow::ALL
            .iter()
            .map(|s| ShiftResponse {
                name: s.name(),
                key: format!("{:?}", s).to_lowercase(),
            })
            .collect(),
    )
}

/// POST /api/v1/datasets (raw CSV or xlsx body)
pub async fn upload_dataset(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<DatasetResponse>), ApiError> {
    match service.register_upload(&body).await {
        Ok((id, dataset)) => Ok((
            StatusCode::CREATED,
            Json(DatasetResponse {
                dataset_id: id.to_string(),
                total_rows: dataset.total_rows,
                records: dataset.records.len(),
                dropped_rows: dataset.dropped_rows,
                operators: dataset.operator_count(),
                first_date: dataset.first_date(),
                last_date: dataset.last_date(),
            }),
        )),
        Err(e) => Err(api_error(e)),
    }
}

/// GET /api/v1/dashboard
pub async fn get_dashboard(
    State(service): State<AppState>,
    Query(params): Query<ViewQuery>,
) -> Result<Json<DashboardView>, ApiError> {
    let update = params.filter_update().map_err(api_error)?;
    match service
        .dashboard(params.session_name(), params.dataset.as_deref(), &update)
        .await
    {
        Ok(view) => Ok(Json(view)),
        Err(e) => Err(api_error(e)),
    }
}

/// GET /api/v1/groups/:code
pub async fn get_group(
    State(service): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<ViewQuery>,
) -> Result<Json<GroupReport>, ApiError> {
    let update = params.filter_update().map_err(api_error)?;
    match service
        .group(&code, params.session_name(), params.dataset.as_deref(), &update)
        .await
    {
        Ok(Some(report)) => Ok(Json(report)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!(
                    "Labor group '{}' not found. Known groups: {}",
                    code,
                    service
                        .config()
                        .labor_groups
                        .iter()
                        .map(|g| g.code.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }),
        )),
        Err(e) => Err(api_error(e)),
    }
}
