/// Submission intake
///
/// Accepting work is one transaction:
///
/// 1. Lock the task; it must exist, be active and have a free slot
/// 2. Reject a repeat submission by the same trainer within the hour
/// 3. Split the task payment into commission and trainer payout
/// 4. Insert the submission, take the slot, credit the trainer's `pending`
///
/// The task row lock serializes concurrent submissions to the same task, so
/// `completed_tasks` never exceeds `total_tasks`.

use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use super::{LedgerError, DUPLICATE_SUBMISSION_WINDOW_SECS};
use crate::models::submission::{NewSubmission, Submission};
use crate::models::subscription::UserSubscription;
use crate::models::task::{Task, TaskStatus};
use crate::models::user::User;
use crate::monetization::reader::SettingsReader;

/// Work submitted by a trainer
#[derive(Debug, Clone)]
pub struct SubmitWork {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub result_data: JsonValue,
    pub time_spent_seconds: i32,
}

/// Records a submission and credits the trainer's pending earnings
///
/// # Errors
///
/// - [`LedgerError::TaskNotFound`] if the task is missing or not active
/// - [`LedgerError::TaskFull`] if every slot is taken
/// - [`LedgerError::DuplicateSubmission`] on a repeat within the hour
/// - [`LedgerError::UserNotFound`] if the trainer row is gone
pub async fn submit_work(
    pool: &PgPool,
    settings: &SettingsReader,
    work: SubmitWork,
) -> Result<Submission, LedgerError> {
    let policy = settings.commission_policy().await?;

    let mut tx = pool.begin().await?;

    let task = Task::lock_for_update(&mut *tx, work.task_id)
        .await?
        .ok_or(LedgerError::TaskNotFound)?;

    // A filled task is also marked completed; report it as full
    if !task.has_capacity() {
        return Err(LedgerError::TaskFull);
    }
    if task.status != TaskStatus::Active {
        return Err(LedgerError::TaskNotFound);
    }

    let window_start = Utc::now() - Duration::seconds(DUPLICATE_SUBMISSION_WINDOW_SECS);
    if Submission::exists_since(&mut *tx, task.id, work.user_id, window_start).await? {
        return Err(LedgerError::DuplicateSubmission);
    }

    let plan_bonus = if policy.rate > 0.0 {
        UserSubscription::active_payment_bonus(&mut *tx, work.user_id).await?
    } else {
        0.0
    };
    let split = policy.split(task.payment_per_task_cents, plan_bonus);

    let submission = Submission::create(
        &mut *tx,
        NewSubmission {
            task_id: task.id,
            user_id: work.user_id,
            result_data: work.result_data,
            time_spent_seconds: work.time_spent_seconds,
            payment_amount_cents: split.trainer_payout_cents,
            commission_cents: split.commission_cents,
        },
    )
    .await?;

    let task = Task::record_submission(&mut *tx, task.id).await?;

    User::credit_pending(&mut *tx, work.user_id, split.trainer_payout_cents)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => LedgerError::UserNotFound,
            other => LedgerError::Database(other),
        })?;

    tx.commit().await?;

    tracing::info!(
        submission_id = %submission.id,
        task_id = %task.id,
        user_id = %work.user_id,
        payout_cents = split.trainer_payout_cents,
        commission_cents = split.commission_cents,
        slots_left = task.remaining_slots(),
        "Submission recorded"
    );

    Ok(submission)
}
