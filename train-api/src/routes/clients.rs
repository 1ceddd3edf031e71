/// Client dashboard and review endpoints
///
/// # Endpoints
///
/// - `GET /api/clients/dashboard` - Task totals and latest submissions
/// - `GET /api/clients/tasks` - Own tasks
/// - `GET /api/clients/tasks/:task_id/submissions` - Submissions on an owned task
/// - `PUT /api/clients/submissions/:id/review` - Approve or reject a submission

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{Page, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use train_shared::{
    auth::{
        authorization::{require_capability, require_ownership, Capability},
        middleware::AuthContext,
    },
    ledger::review::{
        review_submission as apply_review, ReviewDecision, ReviewStatus, ReviewSubmission,
    },
    models::{
        submission::{RecentClientSubmission, Submission, SubmissionStatus, SubmissionWithTrainer},
        task::{ClientTaskSummary, Task},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Dashboard response
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub summary: ClientTaskSummary,
    pub recent_submissions: Vec<RecentClientSubmission>,
}

/// Submissions query
#[derive(Debug, Deserialize)]
pub struct TaskSubmissionsQuery {
    pub status: Option<SubmissionStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Review request
///
/// `status` is parsed by hand so an unknown value is a 400, not a body
/// deserialization failure.
#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    pub status: String,

    pub accuracy_score: Option<f64>,

    #[validate(length(max = 2000, message = "Feedback must be at most 2000 characters"))]
    pub feedback: Option<String>,
}

/// Client dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<DashboardResponse>> {
    require_capability(&auth, Capability::ViewClientDashboard)?;

    let summary = Task::client_summary(&state.db, auth.user_id).await?;
    let recent_submissions = Submission::recent_for_client(&state.db, auth.user_id).await?;

    Ok(Json(DashboardResponse {
        summary,
        recent_submissions,
    }))
}

/// Own tasks, newest first
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Page<Task>>> {
    require_capability(&auth, Capability::ViewClientDashboard)?;

    let page = pagination.resolve();
    let items = Task::list_by_client(&state.db, auth.user_id, page.0, page.1).await?;
    let total = Task::count_by_client(&state.db, auth.user_id).await?;

    Ok(Json(Page::new(items, total, page)))
}

/// Submissions on one of the caller's tasks
///
/// # Errors
///
/// - `403 Forbidden`: Not a client, or not the task owner
/// - `404 Not Found`: Unknown task
pub async fn task_submissions(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
    Query(query): Query<TaskSubmissionsQuery>,
) -> ApiResult<Json<Page<SubmissionWithTrainer>>> {
    require_capability(&auth, Capability::ReviewSubmissions)?;

    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    require_ownership(&auth, task.client_id)?;

    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    }
    .resolve();

    let items = Submission::list_by_task(&state.db, task.id, query.status, page.0, page.1).await?;
    let total = Submission::count_by_task(&state.db, task.id, query.status).await?;

    Ok(Json(Page::new(items, total, page)))
}

/// Reviews a submission and settles the trainer's earnings
///
/// # Endpoint
///
/// ```text
/// PUT /api/clients/submissions/:id/review
///
/// { "status": "approved", "accuracy_score": 92.5, "feedback": "Clean boxes" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Status is not `approved` or `rejected`
/// - `403 Forbidden`: Not a client, or not the task owner
/// - `404 Not Found`: Unknown submission
/// - `409 Conflict`: Submission already reviewed
/// - `422 Unprocessable Entity`: Approval without an accuracy score, or score outside 0-100
pub async fn review_submission(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<Submission>> {
    require_capability(&auth, Capability::ReviewSubmissions)?;
    req.validate()?;

    let status: ReviewStatus = req.status.parse().map_err(ApiError::BadRequest)?;
    let decision = ReviewDecision::from_parts(status, req.accuracy_score)?;

    let submission = apply_review(
        &state.db,
        ReviewSubmission {
            submission_id: id,
            reviewer_id: auth.user_id,
            decision,
            feedback: req.feedback,
        },
    )
    .await?;

    Ok(Json(submission))
}
