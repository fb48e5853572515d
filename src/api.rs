use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, info, warn};

use crate::aggregate::{self, AggregateError, AggregateRequest};
use crate::config::Settings;
use crate::dates::DeadlineClock;
use crate::deadlines;
use crate::documents;
use crate::models::{DeadlineDigest, DeadlineFilter, UniversitySummary};
use crate::store::UniversityStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UniversityStore>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Arc<dyn UniversityStore>, settings: Settings) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/healthz", get(healthz_handler))
        .route("/api/universities", get(universities_handler))
        .route("/api/university/:name", get(university_handler))
        .route("/api/deadlines", get(deadlines_handler))
        .route("/api/aggregate", post(aggregate_handler))
        .with_state(state)
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "message": "University Guide API is running!",
        "endpoints": ["/api/universities", "/api/university/{name}", "/api/deadlines", "/api/aggregate"]
    }))
}

async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn universities_handler(State(state): State<AppState>) -> Response {
    let docs = match state.store.find_all().await {
        Ok(docs) => docs,
        Err(err) => {
            error!(route = "/api/universities", error = %err, "store read failed");
            return error_response(StatusCode::SERVICE_UNAVAILABLE, "University store unavailable");
        }
    };

    let summaries: Vec<UniversitySummary> =
        docs.iter().filter_map(documents::university_summary).collect();
    info!(route = "/api/universities", returned = summaries.len(), "request served");
    Json(summaries).into_response()
}

async fn university_handler(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let found = match state.store.find_by_name(&name).await {
        Ok(found) => found,
        Err(err) => {
            error!(
                route = "/api/university",
                university = %name,
                error = %err,
                "store read failed"
            );
            return error_response(StatusCode::SERVICE_UNAVAILABLE, "University store unavailable");
        }
    };

    match found.as_ref().map(documents::university_from_document) {
        Some(Ok(university)) => Json(university).into_response(),
        Some(Err(err)) => {
            warn!(university = %name, error = %err, "stored document failed validation");
            error_response(StatusCode::NOT_FOUND, "University not found")
        }
        None => error_response(StatusCode::NOT_FOUND, "University not found"),
    }
}

/// Fails open: a store error yields an empty digest.
async fn deadlines_handler(
    State(state): State<AppState>,
    Query(filter): Query<DeadlineFilter>,
) -> Json<DeadlineDigest> {
    let sources = tokio::try_join!(state.store.find_all(), state.store.find_all_deadlines());
    let (docs, standalone) = sources.unwrap_or_else(|err| {
        error!(route = "/api/deadlines", error = %err, "store read failed; serving empty digest");
        (Vec::new(), Vec::new())
    });

    let clock = DeadlineClock::now(state.settings.deadline_offset);
    let digest = deadlines::digest_documents(&docs, &standalone, &filter, &clock);
    info!(
        route = "/api/deadlines",
        university = filter.university.as_deref().unwrap_or("*"),
        city = filter.city.as_deref().unwrap_or("*"),
        total = digest.total_deadlines,
        upcoming = digest.upcoming_count,
        past = digest.past_count,
        "request served"
    );
    Json(digest)
}

async fn aggregate_handler(payload: Result<Json<AggregateRequest>, JsonRejection>) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let message = rejection.body_text();
            warn!(route = "/api/aggregate", error = %message, "rejected request body");
            return error_response(rejection.status(), &message);
        }
    };

    match aggregate::calculate(&request) {
        Ok(value) => Json(json!({
            "university": request.university.trim().to_uppercase(),
            "aggregate": value
        }))
        .into_response(),
        Err(err @ AggregateError::UnknownUniversity(_)) => {
            error_response(StatusCode::NOT_FOUND, &err.to_string())
        }
        Err(err) => error_response(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string()),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
