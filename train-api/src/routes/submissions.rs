/// Trainer submission endpoints
///
/// # Endpoints
///
/// - `POST /api/submissions` - Submit work for a task
/// - `GET /api/submissions` - Own submissions (status filter, pagination)
/// - `GET /api/submissions/stats/summary` - Today / this week / all time
/// - `GET /api/submissions/:id` - One own submission

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{Page, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use train_shared::{
    auth::{
        authorization::{require_capability, Capability},
        middleware::AuthContext,
    },
    ledger::intake::{submit_work, SubmitWork},
    models::submission::{Submission, SubmissionStatus, SubmissionTotals, SubmissionWithTask},
};
use uuid::Uuid;
use validator::Validate;

/// Submit work request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    pub task_id: Uuid,

    /// Task output, stored as-is
    pub result_data: JsonValue,

    #[validate(range(min = 1, message = "Time spent must be positive"))]
    pub time_spent_seconds: i32,
}

/// Listing query
#[derive(Debug, Deserialize)]
pub struct ListSubmissionsQuery {
    pub status: Option<SubmissionStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Stats summary response
#[derive(Debug, Serialize)]
pub struct SubmissionSummaryResponse {
    pub today: SubmissionTotals,
    pub this_week: SubmissionTotals,
    pub all_time: SubmissionTotals,
}

/// Submits work for a task
///
/// # Errors
///
/// - `400 Bad Request`: Task full or duplicate submission within the hour
/// - `403 Forbidden`: Caller is not a trainer
/// - `404 Not Found`: Task missing or not active
pub async fn create_submission(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateSubmissionRequest>,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    require_capability(&auth, Capability::SubmitWork)?;
    req.validate()?;

    let task_id = req.task_id;
    let result = submit_work(
        &state.db,
        &state.settings,
        SubmitWork {
            task_id,
            user_id: auth.user_id,
            result_data: req.result_data,
            time_spent_seconds: req.time_spent_seconds,
        },
    )
    .await;

    match result {
        Ok(submission) => Ok((StatusCode::CREATED, Json(submission))),
        Err(e) => {
            tracing::warn!(user_id = %auth.user_id, task_id = %task_id, error = %e, "Submission rejected");
            Err(e.into())
        }
    }
}

/// Lists the caller's submissions, newest first
pub async fn list_submissions(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListSubmissionsQuery>,
) -> ApiResult<Json<Page<SubmissionWithTask>>> {
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    }
    .resolve();

    let items =
        Submission::list_by_user(&state.db, auth.user_id, query.status, page.0, page.1).await?;
    let total = Submission::count_by_user(&state.db, auth.user_id, query.status).await?;

    Ok(Json(Page::new(items, total, page)))
}

/// Submission counts and earnings for today, the last 7 days and all time
pub async fn submission_summary(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<SubmissionSummaryResponse>> {
    let now = Utc::now();
    let start_of_day = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now);

    let today = Submission::totals_for_user(&state.db, auth.user_id, Some(start_of_day)).await?;
    let this_week =
        Submission::totals_for_user(&state.db, auth.user_id, Some(now - Duration::days(7))).await?;
    let all_time = Submission::totals_for_user(&state.db, auth.user_id, None).await?;

    Ok(Json(SubmissionSummaryResponse {
        today,
        this_week,
        all_time,
    }))
}

/// One of the caller's submissions
///
/// # Errors
///
/// - `404 Not Found`: Unknown submission or owned by someone else
pub async fn get_submission(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Submission>> {
    let submission = Submission::find_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    Ok(Json(submission))
}
