/// Task marketplace endpoints
///
/// # Endpoints
///
/// - `GET /api/tasks` - Available tasks (filters: task_type, difficulty,
///   min_payment_cents, max_payment_cents, limit, offset)
/// - `GET /api/tasks/stats/summary` - Available work by task type
/// - `GET /api/tasks/:id` - Task details with the caller's own submission stats
/// - `POST /api/tasks` - Post a task (clients)

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
use serde::{Deserialize, Serialize};
use train_shared::{
    auth::{
        authorization::{require_capability, Capability},
        middleware::AuthContext,
    },
    models::{
        submission::{Submission, SubmissionTotals},
        task::{CreateTask, Task, TaskDifficulty, TaskFilter, TaskType, TaskTypeSummary},
    },
    monetization::QualityTier,
};
use uuid::Uuid;
use validator::Validate;

/// Listing query
#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub task_type: Option<TaskType>,
    pub difficulty: Option<TaskDifficulty>,
    pub min_payment_cents: Option<i64>,
    pub max_payment_cents: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Marketplace summary response
#[derive(Debug, Serialize)]
pub struct TaskSummaryResponse {
    pub total_available_tasks: i64,
    pub by_type: Vec<TaskTypeSummary>,
}

/// Task details response
#[derive(Debug, Serialize)]
pub struct TaskDetailResponse {
    #[serde(flatten)]
    pub task: Task,

    pub remaining_slots: i32,

    /// The caller's submissions to this task
    pub my_submissions: SubmissionTotals,
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 3, max = 255, message = "Title must be 3-255 characters"))]
    pub title: String,

    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,

    pub task_type: TaskType,
    pub difficulty: TaskDifficulty,

    /// Base payment per submission, before any quality multiplier
    #[validate(range(min = 1, message = "Payment must be positive"))]
    pub payment_per_task_cents: i64,

    #[validate(range(min = 1, max = 480, message = "Estimated time must be 1-480 minutes"))]
    pub estimated_time_minutes: i32,

    #[validate(range(min = 1, max = 100000, message = "Total tasks must be 1-100000"))]
    pub total_tasks: i32,

    #[validate(range(min = 0.0, max = 100.0, message = "Required accuracy must be 0-100"))]
    pub required_accuracy: Option<f64>,

    #[validate(url(message = "Dataset URL must be a valid URL"))]
    pub dataset_url: Option<String>,

    pub instructions: Option<String>,

    /// Quality tier name; requires the quality guarantee strategy
    pub quality_tier: Option<String>,
}

/// Created task response
#[derive(Debug, Serialize)]
pub struct CreateTaskResponse {
    #[serde(flatten)]
    pub task: Task,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_tier: Option<QualityTier>,
}

/// Lists active tasks with free slots
pub async fn list_tasks(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Page<Task>>> {
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    }
    .resolve();

    let filter = TaskFilter {
        task_type: query.task_type,
        difficulty: query.difficulty,
        min_payment_cents: query.min_payment_cents,
        max_payment_cents: query.max_payment_cents,
        limit: page.0,
        offset: page.1,
    };

    let tasks = Task::list_available(&state.db, &filter).await?;
    let total = Task::count_available(&state.db, &filter).await?;

    Ok(Json(Page::new(tasks, total, page)))
}

/// Available work grouped by task type
pub async fn task_summary(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<TaskSummaryResponse>> {
    let by_type = Task::marketplace_summary(&state.db).await?;
    let total_available_tasks = by_type.iter().map(|s| s.available_tasks).sum();

    Ok(Json(TaskSummaryResponse {
        total_available_tasks,
        by_type,
    }))
}

/// Task details
///
/// # Errors
///
/// - `404 Not Found`: Unknown task
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskDetailResponse>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let my_submissions = Submission::totals_for_user_task(&state.db, auth.user_id, id).await?;

    Ok(Json(TaskDetailResponse {
        remaining_slots: task.remaining_slots(),
        task,
        my_submissions,
    }))
}

/// Posts a new task
///
/// With a `quality_tier`, the per-task payment is multiplied by the tier's
/// multiplier.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a client
/// - `422 Unprocessable Entity`: Validation failed or unknown quality tier
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<CreateTaskResponse>)> {
    require_capability(&auth, Capability::PostTasks)?;
    req.validate()?;

    let quality_tier = match req.quality_tier.as_deref() {
        Some(name) => Some(state.settings.quality_tier(name).await?.ok_or_else(|| {
            ApiError::invalid_field(
                "quality_tier",
                format!("Quality tier '{}' is not available", name),
            )
        })?),
        None => None,
    };

    let payment_per_task_cents = match &quality_tier {
        Some(tier) => (req.payment_per_task_cents as f64 * tier.multiplier).round() as i64,
        None => req.payment_per_task_cents,
    };

    let task = Task::create(
        &state.db,
        CreateTask {
            client_id: auth.user_id,
            title: req.title,
            description: req.description,
            task_type: req.task_type,
            difficulty: req.difficulty,
            payment_per_task_cents,
            estimated_time_minutes: req.estimated_time_minutes,
            total_tasks: req.total_tasks,
            required_accuracy: req.required_accuracy.unwrap_or(0.0),
            dataset_url: req.dataset_url,
            instructions: req.instructions,
        },
    )
    .await?;

    tracing::info!(
        task_id = %task.id,
        client_id = %auth.user_id,
        payment_cents = task.payment_per_task_cents,
        total_tasks = task.total_tasks,
        "Task created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateTaskResponse { task, quality_tier }),
    ))
}
