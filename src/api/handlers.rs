//! API request handlers
//!
//! Every response uses the [`ApiResponse`] envelope. Structural failures
//! (bad input files, invalid formula sets) map to 4xx, everything else to
//! 500. Row-level problems are part of a successful processing summary.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::server::{AppState, LastRun};
use crate::core::process_file;
use crate::core::registry::{FormulaFile, FormulaRecord};
use crate::error::CalcError;
use crate::extract::{extract_formulas, ExtractionReport, FallbackSuggester, PlainTextExtractor};
use crate::table::resolve_artifact;
use crate::vocabulary::{self, Category};

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Error response: status code plus an error envelope
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<CalcError> for ApiError {
    fn from(e: CalcError) -> Self {
        let status = match &e {
            CalcError::UnsupportedFile(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            e if e.is_input_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(ApiResponse::<()>::err(self.message))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

//==============================================================================
// Info endpoints
//==============================================================================

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub formulas_loaded: usize,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

fn endpoint(method: &str, path: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(RootResponse {
        name: "PolicyCalc API Server".to_string(),
        version: state.version.clone(),
        description: "Applies extracted insurance formulas to policy tables".to_string(),
        formulas_loaded: state.registry.len(),
        endpoints: vec![
            endpoint("GET", "/health", "Health check endpoint"),
            endpoint("GET", "/version", "Get server version"),
            endpoint("GET", "/api/v1/formulas", "List the active formula set"),
            endpoint("POST", "/api/v1/formulas", "Replace the active formula set"),
            endpoint("POST", "/api/v1/process", "Apply formulas to a policy table"),
            endpoint("GET", "/api/v1/download/:filename", "Download an output artifact"),
            endpoint("POST", "/api/v1/extract", "Suggest formulas from a document"),
            endpoint("GET", "/api/v1/variables", "List the variable vocabulary"),
        ],
    }))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub formulas_loaded: usize,
    pub registry_version: u64,
    pub timestamp: DateTime<Utc>,
}

/// GET /health - Health check
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.registry.snapshot();
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        formulas_loaded: snapshot.len(),
        registry_version: snapshot.version,
        timestamp: Utc::now(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: ["formulas", "process", "download", "extract", "variables"]
            .iter()
            .map(|f| f.to_string())
            .collect(),
    }))
}

//==============================================================================
// Formula registry
//==============================================================================

/// Replace response
#[derive(Serialize)]
pub struct ReplaceResponse {
    pub message: String,
    pub count: usize,
    pub version: u64,
}

/// POST /api/v1/formulas - Replace the active formula set
pub async fn replace_formulas(
    State(state): State<Arc<AppState>>,
    Json(file): Json<FormulaFile>,
) -> ApiResult<ReplaceResponse> {
    let set = state.registry.replace(file.into_records())?;
    info!(count = set.len(), version = set.version, "Stored extracted formulas");

    Ok(Json(ApiResponse::ok(ReplaceResponse {
        message: "Stored extracted formulas".to_string(),
        count: set.len(),
        version: set.version,
    })))
}

/// Registry introspection response
#[derive(Serialize)]
pub struct FormulasResponse {
    pub version: u64,
    pub loaded_at: DateTime<Utc>,
    pub count: usize,
    pub formulas: Vec<FormulaRecord>,
    pub last_run: Option<LastRun>,
}

/// GET /api/v1/formulas - Registry contents and last run counters
pub async fn get_formulas(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.registry.snapshot();
    Json(ApiResponse::ok(FormulasResponse {
        version: snapshot.version,
        loaded_at: snapshot.loaded_at,
        count: snapshot.len(),
        formulas: snapshot.records(),
        last_run: state.last_run(),
    }))
}

//==============================================================================
// Processing and download
//==============================================================================

/// Process request
#[derive(Deserialize)]
pub struct ProcessRequest {
    pub file_path: String,
}

/// POST /api/v1/process - Apply the active formulas to a policy table
pub async fn process(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessRequest>,
) -> ApiResult<crate::core::ProcessingSummary> {
    let snapshot = state.registry.snapshot();
    let summary = process_file(&PathBuf::from(&req.file_path), &snapshot, &state.config)?;
    state.record_run(&summary);
    Ok(Json(ApiResponse::ok(summary)))
}

fn content_type(filename: &str) -> &'static str {
    if filename.to_lowercase().ends_with(".csv") {
        "text/csv"
    } else {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    }
}

/// GET /api/v1/download/:filename - Fetch an output artifact
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = resolve_artifact(&state.config.output_dir, &filename).map_err(|e| match e {
        CalcError::Import(message) => ApiError::new(StatusCode::NOT_FOUND, message),
        other => ApiError::from(other),
    })?;

    let bytes = std::fs::read(&path).map_err(CalcError::from)?;
    Ok((
        [
            (header::CONTENT_TYPE, content_type(&filename).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

//==============================================================================
// Extraction and vocabulary
//==============================================================================

/// Extract request
#[derive(Deserialize)]
pub struct ExtractRequest {
    pub file_path: String,
    #[serde(default)]
    pub targets: Vec<String>,
    /// Replace the active formula set with the result
    #[serde(default)]
    pub store: bool,
}

/// Extract response
#[derive(Serialize)]
pub struct ExtractResponse {
    #[serde(flatten)]
    pub report: ExtractionReport,
    pub stored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_version: Option<u64>,
}

/// POST /api/v1/extract - Suggest formulas from a document
pub async fn extract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> ApiResult<ExtractResponse> {
    let suggester = FallbackSuggester::local()?;
    let report = extract_formulas(
        &PathBuf::from(&req.file_path),
        &PlainTextExtractor,
        &suggester,
        &req.targets,
    )?;

    let registry_version = if req.store && !report.formulas.is_empty() {
        Some(state.registry.replace(report.formulas.clone())?.version)
    } else {
        None
    };

    Ok(Json(ApiResponse::ok(ExtractResponse {
        stored: registry_version.is_some(),
        registry_version,
        report,
    })))
}

/// Vocabulary entry
#[derive(Serialize)]
pub struct VariableInfo {
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// GET /api/v1/variables - List the variable vocabulary
pub async fn variables() -> impl IntoResponse {
    let entries: Vec<VariableInfo> = [Category::Insurance, Category::Financial]
        .into_iter()
        .flat_map(vocabulary::by_category)
        .map(|v| VariableInfo {
            name: v.name.to_string(),
            description: v.description.to_string(),
            aliases: v.aliases.iter().map(|a| a.to_string()).collect(),
            category: format!("{:?}", v.category).to_lowercase(),
            role: vocabulary::role(v.name).map(str::to_string),
        })
        .collect();
    Json(ApiResponse::ok(entries))
}
