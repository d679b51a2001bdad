use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::builder::build_group;
use crate::config::ServerConfig;
use crate::data::{Catalogue, GroupInput, ModuleLesson, Selection, SolveOptions, SolveOutput};
use crate::error::MalformedInput;
use crate::solver;

/// Body of `POST /v1/timetable/optimize`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    pub catalogue: Catalogue,
    /// One selection per group member, in group order.
    pub selections: Vec<Selection>,
    pub target_index: usize,
    #[serde(flatten)]
    pub options: SolveOptions,
}

/// Body of `POST /v1/timetable/optimize-lessons`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonsRequest {
    pub timetables: Vec<Vec<ModuleLesson>>,
    pub target_index: usize,
    #[serde(flatten)]
    pub options: SolveOptions,
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(MalformedInput),
    Internal(String),
}

impl From<MalformedInput> for AppError {
    fn from(err: MalformedInput) -> Self {
        AppError::BadRequest(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest(err) => (StatusCode::BAD_REQUEST, "MALFORMED_INPUT", err.to_string()),
            AppError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message),
        };
        let body = ApiError {
            code: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Clone)]
struct AppState {
    search_limit: Option<usize>,
}

impl AppState {
    fn fill_defaults(&self, mut options: SolveOptions) -> SolveOptions {
        if options.search_limit.is_none() {
            options.search_limit = self.search_limit;
        }
        options
    }
}

async fn run_blocking<T, F>(job: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, MalformedInput> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result.map_err(|err| {
            warn!("Rejected request: {}", err);
            AppError::from(err)
        }),
        Err(join_err) => Err(AppError::Internal(format!("solver task failed: {join_err}"))),
    }
}

async fn optimize_handler(
    State(state): State<AppState>,
    Json(request): Json<OptimizeRequest>,
) -> Result<Json<SolveOutput>, AppError> {
    let options = state.fill_defaults(request.options);
    let output = run_blocking(move || {
        let members = build_group(&request.catalogue, &request.selections)?;
        let input = GroupInput {
            members,
            target_index: request.target_index,
        };
        solver::solve(&input, &options)
    })
    .await?;
    Ok(Json(output))
}

async fn optimize_lessons_handler(
    State(state): State<AppState>,
    Json(request): Json<LessonsRequest>,
) -> Result<Json<Vec<Vec<ModuleLesson>>>, AppError> {
    let options = state.fill_defaults(request.options);
    let timetables =
        run_blocking(move || solver::optimise_lessons(&request.timetables, request.target_index, &options)).await?;
    Ok(Json(timetables))
}

pub fn router(config: &ServerConfig) -> Router {
    let state = AppState {
        search_limit: config.search_limit,
    };
    Router::new()
        .route("/v1/timetable/optimize", post(optimize_handler))
        .route("/v1/timetable/optimize-lessons", post(optimize_lessons_handler))
        .with_state(state)
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let app = router(&config);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}
