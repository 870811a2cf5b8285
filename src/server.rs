use crate::config::{ModelOptions, ServerConfig, SolveOptions};
use crate::data::{Catalog, FixedSlot, PreferenceWeight};
use crate::error::{SolveError, TimetableError};
use crate::model::TimetableModel;
use crate::solver::{self, SolveOutcome};
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use log::info;
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/timetable/solve`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub catalog: Catalog,
    #[serde(default)]
    pub preferences: Vec<PreferenceWeight>,
    #[serde(default)]
    pub fixed_slots: Vec<FixedSlot>,
    #[serde(default)]
    pub model_options: ModelOptions,
    #[serde(default)]
    pub solve_options: SolveOptions,
}

impl SolveRequest {
    /// Build, apply the hooks, solve.
    pub fn run(&self) -> Result<SolveOutcome, TimetableError> {
        let mut model = TimetableModel::build(&self.catalog, &self.model_options)?;
        model.apply_preference_weights(&self.preferences)?;
        model.apply_fixed_slots(&self.fixed_slots)?;
        Ok(solver::solve(&model, &self.solve_options)?)
    }
}

/// Body of `POST /v1/timetable/solve-all`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveAllRequest {
    pub catalogs: Vec<Catalog>,
    #[serde(default)]
    pub model_options: ModelOptions,
    #[serde(default)]
    pub solve_options: SolveOptions,
}

/// One entry of the solve-all response.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Outcome(SolveOutcome),
    Error { status: &'static str, error: String },
}

fn status_of(error: &TimetableError) -> StatusCode {
    match error {
        TimetableError::Model(_) | TimetableError::Solve(SolveError::InvalidOptions(_)) => {
            StatusCode::BAD_REQUEST
        }
        TimetableError::Solve(SolveError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn solve_handler(
    Json(request): Json<SolveRequest>,
) -> Result<Json<SolveOutcome>, (StatusCode, String)> {
    let result = tokio::task::spawn_blocking(move || request.run())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    match result {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => Err((status_of(&e), e.to_string())),
    }
}

async fn solve_all_handler(
    Json(request): Json<SolveAllRequest>,
) -> Result<Json<Vec<BatchEntry>>, (StatusCode, String)> {
    let results = tokio::task::spawn_blocking(move || {
        solver::solve_all(&request.catalogs, &request.model_options, &request.solve_options)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let entries = results
        .into_iter()
        .map(|result| match result {
            Ok(outcome) => BatchEntry::Outcome(outcome),
            Err(e) => BatchEntry::Error {
                status: "error",
                error: e.to_string(),
            },
        })
        .collect();
    Ok(Json(entries))
}

pub fn router() -> Router {
    Router::new()
        .route("/v1/timetable/solve", post(solve_handler))
        .route("/v1/timetable/solve-all", post(solve_all_handler))
}

pub async fn run_server(config: &ServerConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, router()).await
}
