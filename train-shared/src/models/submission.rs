/// Submission model and database operations
///
/// A submission is one trainer's result for one slot of a task. It is created
/// in `pending_review`, reviewed exactly once, and never deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE submissions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     result_data JSONB NOT NULL,
///     time_spent_seconds INTEGER NOT NULL,
///     status submission_status NOT NULL DEFAULT 'pending_review',
///     payment_amount_cents BIGINT NOT NULL DEFAULT 0,
///     commission_cents BIGINT NOT NULL DEFAULT 0,
///     accuracy_score DOUBLE PRECISION,
///     feedback TEXT,
///     reviewed_by UUID REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     reviewed_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::task::TaskType;

/// Review state of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    PendingReview,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::PendingReview => "pending_review",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trainer work submission
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Submission {
    pub id: Uuid,
    pub task_id: Uuid,

    /// Submitting trainer
    pub user_id: Uuid,

    /// Opaque task result
    pub result_data: JsonValue,

    pub time_spent_seconds: i32,
    pub status: SubmissionStatus,

    /// Trainer's share: pending while under review, earned once approved,
    /// zero after rejection
    pub payment_amount_cents: i64,

    /// Platform share withheld at intake
    pub commission_cents: i64,

    pub accuracy_score: Option<f64>,
    pub feedback: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Input for a new pending submission
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub result_data: JsonValue,
    pub time_spent_seconds: i32,
    pub payment_amount_cents: i64,
    pub commission_cents: i64,
}

/// Review outcome written back onto a submission
#[derive(Debug, Clone)]
pub struct ReviewRecord {
    pub status: SubmissionStatus,
    pub accuracy_score: Option<f64>,
    pub feedback: Option<String>,
    pub reviewed_by: Uuid,
    pub payment_amount_cents: i64,
}

/// Submission joined with its task title, for trainer history
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubmissionWithTask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub task_title: String,
    pub task_type: TaskType,
    pub status: SubmissionStatus,
    pub payment_amount_cents: i64,
    pub accuracy_score: Option<f64>,
    pub feedback: Option<String>,
    pub time_spent_seconds: i32,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Submission joined with its trainer, for client review queues
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubmissionWithTrainer {
    pub id: Uuid,
    pub task_id: Uuid,
    pub task_title: String,
    pub status: SubmissionStatus,
    pub result_data: JsonValue,
    pub payment_amount_cents: i64,
    pub accuracy_score: Option<f64>,
    pub time_spent_seconds: i32,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub trainer_first_name: String,
    pub trainer_last_name: String,
    pub trainer_accuracy_rating: f64,
}

/// Counts and sums over a set of a trainer's submissions
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct SubmissionTotals {
    pub submissions: i64,
    pub approved: i64,
    pub pending: i64,
    pub rejected: i64,
    pub earned_cents: i64,
    pub time_spent_seconds: i64,
    pub average_accuracy: Option<f64>,
}

/// Approved work grouped by task type
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskTypeEarnings {
    pub task_type: TaskType,
    pub submissions: i64,
    pub earned_cents: i64,
    pub average_accuracy: Option<f64>,
}

/// Approved work grouped by calendar month
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MonthlyEarnings {
    pub month: NaiveDate,
    pub submissions: i64,
    pub earned_cents: i64,
}

/// Approved work for one day
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyPerformance {
    pub date: NaiveDate,
    pub tasks_completed: i64,
    pub average_accuracy: Option<f64>,
    pub earned_cents: i64,
}

/// Latest submission across a client's tasks
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentClientSubmission {
    pub id: Uuid,
    pub task_title: String,
    pub trainer_first_name: String,
    pub trainer_last_name: String,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
}

const TOTALS_COLUMNS: &str = r#"
    COUNT(*) AS submissions,
    COUNT(*) FILTER (WHERE status = 'approved') AS approved,
    COUNT(*) FILTER (WHERE status = 'pending_review') AS pending,
    COUNT(*) FILTER (WHERE status = 'rejected') AS rejected,
    COALESCE(SUM(payment_amount_cents) FILTER (WHERE status = 'approved'), 0)::BIGINT AS earned_cents,
    COALESCE(SUM(time_spent_seconds), 0)::BIGINT AS time_spent_seconds,
    AVG(accuracy_score)::FLOAT8 AS average_accuracy
"#;

impl Submission {
    /// Inserts a pending submission
    pub async fn create(conn: &mut PgConnection, data: NewSubmission) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (
                task_id, user_id, result_data, time_spent_seconds,
                payment_amount_cents, commission_cents
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.result_data)
        .bind(data.time_spent_seconds)
        .bind(data.payment_amount_cents)
        .bind(data.commission_cents)
        .fetch_one(conn)
        .await
    }

    /// Finds a submission by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a submission only if it belongs to `user_id`
    pub async fn find_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Locks the submission row for the rest of the transaction
    pub async fn lock_for_update(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Whether the trainer submitted to this task at or after `since`
    pub async fn exists_since(
        conn: &mut PgConnection,
        task_id: Uuid,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM submissions
                WHERE task_id = $1 AND user_id = $2 AND created_at >= $3
            )
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(since)
        .fetch_one(conn)
        .await
    }

    /// Writes the review outcome; only matches rows still pending
    pub async fn mark_reviewed(
        conn: &mut PgConnection,
        id: Uuid,
        review: ReviewRecord,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions
            SET status = $2,
                accuracy_score = $3,
                feedback = $4,
                reviewed_by = $5,
                payment_amount_cents = $6,
                reviewed_at = NOW()
            WHERE id = $1 AND status = 'pending_review'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(review.status)
        .bind(review.accuracy_score)
        .bind(review.feedback)
        .bind(review.reviewed_by)
        .bind(review.payment_amount_cents)
        .fetch_one(conn)
        .await
    }

    /// A trainer's submissions, newest first
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        status: Option<SubmissionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SubmissionWithTask>, sqlx::Error> {
        sqlx::query_as::<_, SubmissionWithTask>(
            r#"
            SELECT s.id, s.task_id, t.title AS task_title, t.task_type, s.status,
                   s.payment_amount_cents, s.accuracy_score, s.feedback,
                   s.time_spent_seconds, s.created_at, s.reviewed_at
            FROM submissions s
            JOIN tasks t ON t.id = s.task_id
            WHERE s.user_id = $1
              AND ($2::submission_status IS NULL OR s.status = $2)
            ORDER BY s.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Number of a trainer's submissions matching the status filter
    pub async fn count_by_user(
        pool: &PgPool,
        user_id: Uuid,
        status: Option<SubmissionStatus>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM submissions
            WHERE user_id = $1 AND ($2::submission_status IS NULL OR status = $2)
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(pool)
        .await
    }

    /// Submissions for one task, newest first
    pub async fn list_by_task(
        pool: &PgPool,
        task_id: Uuid,
        status: Option<SubmissionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SubmissionWithTrainer>, sqlx::Error> {
        sqlx::query_as::<_, SubmissionWithTrainer>(
            r#"
            SELECT s.id, s.task_id, t.title AS task_title, s.status, s.result_data,
                   s.payment_amount_cents, s.accuracy_score, s.time_spent_seconds,
                   s.created_at, s.reviewed_at,
                   u.first_name AS trainer_first_name,
                   u.last_name AS trainer_last_name,
                   u.accuracy_rating AS trainer_accuracy_rating
            FROM submissions s
            JOIN tasks t ON t.id = s.task_id
            JOIN users u ON u.id = s.user_id
            WHERE s.task_id = $1
              AND ($2::submission_status IS NULL OR s.status = $2)
            ORDER BY s.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(task_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Number of submissions for one task matching the status filter
    pub async fn count_by_task(
        pool: &PgPool,
        task_id: Uuid,
        status: Option<SubmissionStatus>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM submissions
            WHERE task_id = $1 AND ($2::submission_status IS NULL OR status = $2)
            "#,
        )
        .bind(task_id)
        .bind(status)
        .fetch_one(pool)
        .await
    }

    /// Totals for a trainer's submissions created at or after `since`
    /// (all time when `None`)
    pub async fn totals_for_user(
        pool: &PgPool,
        user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<SubmissionTotals, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM submissions WHERE user_id = $1 AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2)",
            TOTALS_COLUMNS
        );

        sqlx::query_as::<_, SubmissionTotals>(&query)
            .bind(user_id)
            .bind(since)
            .fetch_one(pool)
            .await
    }

    /// Totals for one trainer on one task
    pub async fn totals_for_user_task(
        pool: &PgPool,
        user_id: Uuid,
        task_id: Uuid,
    ) -> Result<SubmissionTotals, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM submissions WHERE user_id = $1 AND task_id = $2",
            TOTALS_COLUMNS
        );

        sqlx::query_as::<_, SubmissionTotals>(&query)
            .bind(user_id)
            .bind(task_id)
            .fetch_one(pool)
            .await
    }

    /// Approved earnings grouped by task type
    pub async fn earnings_by_task_type(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<TaskTypeEarnings>, sqlx::Error> {
        sqlx::query_as::<_, TaskTypeEarnings>(
            r#"
            SELECT t.task_type,
                   COUNT(s.id) AS submissions,
                   COALESCE(SUM(s.payment_amount_cents), 0)::BIGINT AS earned_cents,
                   AVG(s.accuracy_score)::FLOAT8 AS average_accuracy
            FROM submissions s
            JOIN tasks t ON t.id = s.task_id
            WHERE s.user_id = $1 AND s.status = 'approved'
            GROUP BY t.task_type
            ORDER BY earned_cents DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Approved earnings for the last twelve months
    pub async fn earnings_by_month(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<MonthlyEarnings>, sqlx::Error> {
        sqlx::query_as::<_, MonthlyEarnings>(
            r#"
            SELECT date_trunc('month', reviewed_at)::DATE AS month,
                   COUNT(*) AS submissions,
                   COALESCE(SUM(payment_amount_cents), 0)::BIGINT AS earned_cents
            FROM submissions
            WHERE user_id = $1
              AND status = 'approved'
              AND reviewed_at >= date_trunc('month', NOW()) - INTERVAL '11 months'
            GROUP BY 1
            ORDER BY 1 DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Daily approved work over the last 30 days
    pub async fn performance_trend(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<DailyPerformance>, sqlx::Error> {
        sqlx::query_as::<_, DailyPerformance>(
            r#"
            SELECT created_at::DATE AS date,
                   COUNT(*) AS tasks_completed,
                   AVG(accuracy_score)::FLOAT8 AS average_accuracy,
                   COALESCE(SUM(payment_amount_cents), 0)::BIGINT AS earned_cents
            FROM submissions
            WHERE user_id = $1
              AND status = 'approved'
              AND created_at >= CURRENT_DATE - INTERVAL '30 days'
            GROUP BY 1
            ORDER BY 1 DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Ten latest submissions across a client's tasks
    pub async fn recent_for_client(
        pool: &PgPool,
        client_id: Uuid,
    ) -> Result<Vec<RecentClientSubmission>, sqlx::Error> {
        sqlx::query_as::<_, RecentClientSubmission>(
            r#"
            SELECT s.id, t.title AS task_title,
                   u.first_name AS trainer_first_name,
                   u.last_name AS trainer_last_name,
                   s.status, s.created_at
            FROM submissions s
            JOIN tasks t ON t.id = s.task_id
            JOIN users u ON u.id = s.user_id
            WHERE t.client_id = $1
            ORDER BY s.created_at DESC
            LIMIT 10
            "#,
        )
        .bind(client_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_status_names() {
        assert_eq!(SubmissionStatus::PendingReview.as_str(), "pending_review");
        assert_eq!(
            serde_json::to_string(&SubmissionStatus::PendingReview).unwrap(),
            "\"pending_review\""
        );
        let parsed: SubmissionStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(parsed, SubmissionStatus::Rejected);
    }
}
