/// Task model and database operations
///
/// A task is a batch of identical micro-jobs posted by a client. Each accepted
/// submission increments `completed_tasks`; the task stops accepting work once
/// it reaches `total_tasks`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     client_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL,
///     task_type task_type NOT NULL,
///     difficulty task_difficulty NOT NULL,
///     payment_per_task_cents BIGINT NOT NULL,
///     estimated_time_minutes INTEGER NOT NULL,
///     total_tasks INTEGER NOT NULL,
///     completed_tasks INTEGER NOT NULL DEFAULT 0,
///     required_accuracy DOUBLE PRECISION NOT NULL DEFAULT 90,
///     dataset_url TEXT,
///     instructions TEXT,
///     status task_status NOT NULL DEFAULT 'active',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CHECK (completed_tasks >= 0 AND completed_tasks <= total_tasks)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use train_shared::models::task::{Task, TaskFilter};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let filter = TaskFilter { limit: 20, ..Default::default() };
/// let tasks = Task::list_available(&pool, &filter).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Kind of micro-task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    ImageLabeling,
    TextClassification,
    AudioTranscription,
    DataValidation,
    SentimentAnalysis,
}

impl TaskType {
    /// Converts task type to its database string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::ImageLabeling => "image_labeling",
            TaskType::TextClassification => "text_classification",
            TaskType::AudioTranscription => "audio_transcription",
            TaskType::DataValidation => "data_validation",
            TaskType::SentimentAnalysis => "sentiment_analysis",
        }
    }
}

/// Task difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_difficulty", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskDifficulty {
    Easy,
    Medium,
    Hard,
}

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepting submissions while capacity remains
    Active,

    /// Temporarily closed by the client
    Paused,

    /// Every slot has been filled
    Completed,
}

/// Task posted by a client
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Owning client
    pub client_id: Uuid,

    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    pub difficulty: TaskDifficulty,

    /// Gross payment per accepted submission
    pub payment_per_task_cents: i64,

    pub estimated_time_minutes: i32,

    /// Number of submissions the client wants
    pub total_tasks: i32,

    /// Number of submissions received so far
    pub completed_tasks: i32,

    /// Minimum accuracy the client expects (0..=100)
    pub required_accuracy: f64,

    pub dataset_url: Option<String>,
    pub instructions: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether another submission fits
    pub fn has_capacity(&self) -> bool {
        self.completed_tasks < self.total_tasks
    }

    /// Whether the task accepts work right now
    pub fn is_accepting_work(&self) -> bool {
        self.status == TaskStatus::Active && self.has_capacity()
    }

    /// Slots left to fill
    pub fn remaining_slots(&self) -> i32 {
        (self.total_tasks - self.completed_tasks).max(0)
    }
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    pub difficulty: TaskDifficulty,
    pub payment_per_task_cents: i64,
    pub estimated_time_minutes: i32,
    pub total_tasks: i32,
    pub required_accuracy: f64,
    pub dataset_url: Option<String>,
    pub instructions: Option<String>,
}

/// Marketplace listing filters
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub task_type: Option<TaskType>,
    pub difficulty: Option<TaskDifficulty>,
    pub min_payment_cents: Option<i64>,
    pub max_payment_cents: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

/// Per-type marketplace aggregate
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskTypeSummary {
    pub task_type: TaskType,
    pub available_tasks: i64,
    pub remaining_slots: i64,
    pub average_payment_cents: Option<f64>,
}

/// Client-wide task aggregate
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ClientTaskSummary {
    pub total_tasks: i64,
    pub active_tasks: i64,
    pub completed_tasks: i64,
    pub total_submissions_needed: i64,
    pub total_submissions_received: i64,
    pub total_spent_cents: i64,
    pub estimated_remaining_cents: i64,
}

impl Task {
    /// Creates a new active task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (
                client_id, title, description, task_type, difficulty,
                payment_per_task_cents, estimated_time_minutes, total_tasks,
                required_accuracy, dataset_url, instructions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(data.client_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.task_type)
        .bind(data.difficulty)
        .bind(data.payment_per_task_cents)
        .bind(data.estimated_time_minutes)
        .bind(data.total_tasks)
        .bind(data.required_accuracy)
        .bind(data.dataset_url)
        .bind(data.instructions)
        .fetch_one(pool)
        .await
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active tasks with free slots, newest first
    pub async fn list_available(pool: &PgPool, filter: &TaskFilter) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE status = 'active'
              AND completed_tasks < total_tasks
              AND ($1::task_type IS NULL OR task_type = $1)
              AND ($2::task_difficulty IS NULL OR difficulty = $2)
              AND ($3::BIGINT IS NULL OR payment_per_task_cents >= $3)
              AND ($4::BIGINT IS NULL OR payment_per_task_cents <= $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.task_type)
        .bind(filter.difficulty)
        .bind(filter.min_payment_cents)
        .bind(filter.max_payment_cents)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await
    }

    /// Count matching `list_available` without pagination
    pub async fn count_available(pool: &PgPool, filter: &TaskFilter) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tasks
            WHERE status = 'active'
              AND completed_tasks < total_tasks
              AND ($1::task_type IS NULL OR task_type = $1)
              AND ($2::task_difficulty IS NULL OR difficulty = $2)
              AND ($3::BIGINT IS NULL OR payment_per_task_cents >= $3)
              AND ($4::BIGINT IS NULL OR payment_per_task_cents <= $4)
            "#,
        )
        .bind(filter.task_type)
        .bind(filter.difficulty)
        .bind(filter.min_payment_cents)
        .bind(filter.max_payment_cents)
        .fetch_one(pool)
        .await
    }

    /// Available work grouped by task type
    pub async fn marketplace_summary(pool: &PgPool) -> Result<Vec<TaskTypeSummary>, sqlx::Error> {
        sqlx::query_as::<_, TaskTypeSummary>(
            r#"
            SELECT task_type,
                   COUNT(*) AS available_tasks,
                   COALESCE(SUM(total_tasks - completed_tasks), 0)::BIGINT AS remaining_slots,
                   AVG(payment_per_task_cents)::FLOAT8 AS average_payment_cents
            FROM tasks
            WHERE status = 'active' AND completed_tasks < total_tasks
            GROUP BY task_type
            ORDER BY task_type
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// A client's tasks, newest first
    pub async fn list_by_client(
        pool: &PgPool,
        client_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE client_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(client_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Number of tasks owned by a client
    pub async fn count_by_client(pool: &PgPool, client_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE client_id = $1")
            .bind(client_id)
            .fetch_one(pool)
            .await
    }

    /// Totals across all of a client's tasks
    pub async fn client_summary(pool: &PgPool, client_id: Uuid) -> Result<ClientTaskSummary, sqlx::Error> {
        sqlx::query_as::<_, ClientTaskSummary>(
            r#"
            SELECT COUNT(*) AS total_tasks,
                   COUNT(*) FILTER (WHERE status = 'active') AS active_tasks,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed_tasks,
                   COALESCE(SUM(total_tasks), 0)::BIGINT AS total_submissions_needed,
                   COALESCE(SUM(completed_tasks), 0)::BIGINT AS total_submissions_received,
                   COALESCE(SUM(payment_per_task_cents * completed_tasks), 0)::BIGINT AS total_spent_cents,
                   COALESCE(SUM(payment_per_task_cents * (total_tasks - completed_tasks)), 0)::BIGINT
                       AS estimated_remaining_cents
            FROM tasks
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_one(pool)
        .await
    }

    /// Locks the task row for the rest of the transaction
    pub async fn lock_for_update(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Owner of a task, read inside a transaction
    pub async fn owner_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar("SELECT client_id FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Takes one slot; marks the task completed when the last slot goes
    pub async fn record_submission(conn: &mut PgConnection, id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET completed_tasks = completed_tasks + 1,
                status = CASE
                    WHEN completed_tasks + 1 >= total_tasks THEN 'completed'::task_status
                    ELSE status
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(conn)
        .await
    }
}
