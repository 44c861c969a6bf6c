use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{IntakeSubmission, RequestId};
use super::repository::{
    AlertPublisher, AssessmentRepository, AssessmentStatusView, RepositoryError,
};
use super::service::{AssessmentServiceError, VendorAssessmentService};

const DEFAULT_PENDING_LIMIT: usize = 50;

/// Router builder exposing HTTP endpoints for vendor intake and lookup.
pub fn assessment_router<R, A>(service: Arc<VendorAssessmentService<R, A>>) -> Router
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    Router::new()
        .route("/api/v1/vendors/assessments", post(submit_handler::<R, A>))
        .route(
            "/api/v1/vendors/assessments/pending",
            get(pending_handler::<R, A>),
        )
        .route(
            "/api/v1/vendors/assessments/:request_id",
            get(fetch_handler::<R, A>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<R, A>(
    State(service): State<Arc<VendorAssessmentService<R, A>>>,
    axum::Json(submission): axum::Json<IntakeSubmission>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    match service.submit(submission).await {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(AssessmentServiceError::Repository(RepositoryError::Conflict)) => {
            let payload = json!({
                "error": "assessment already exists for this requestId",
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn fetch_handler<R, A>(
    State(service): State<Arc<VendorAssessmentService<R, A>>>,
    Path(request_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    let id = RequestId(request_id);
    match service.get(&id) {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(AssessmentServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "requestId": id.0,
                "error": "assessment not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PendingQuery {
    limit: Option<usize>,
}

pub(crate) async fn pending_handler<R, A>(
    State(service): State<Arc<VendorAssessmentService<R, A>>>,
    Query(query): Query<PendingQuery>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AlertPublisher + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_PENDING_LIMIT);
    match service.pending_review(limit) {
        Ok(records) => {
            let views: Vec<AssessmentStatusView> =
                records.iter().map(AssessmentStatusView::from).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
