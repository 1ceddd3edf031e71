/// Review and settlement of submitted work
///
/// The submission row is locked and must still be `pending_review`, so a
/// second review of the same submission fails instead of moving money twice.
/// The trainer row is locked after it and updated from the locked values.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{running_accuracy, LedgerError};
use crate::models::monetization::{CommissionTransaction, NewCommissionTransaction};
use crate::models::submission::{ReviewRecord, Submission, SubmissionStatus};
use crate::models::task::Task;
use crate::models::user::User;

/// Reviewer's verdict
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReviewDecision {
    Approved { accuracy_score: f64 },
    Rejected { accuracy_score: Option<f64> },
}

impl ReviewDecision {
    /// Builds a decision from its wire form; approval requires a score
    pub fn from_parts(
        status: ReviewStatus,
        accuracy_score: Option<f64>,
    ) -> Result<Self, LedgerError> {
        match status {
            ReviewStatus::Approved => accuracy_score
                .map(|accuracy_score| ReviewDecision::Approved { accuracy_score })
                .ok_or(LedgerError::MissingAccuracyScore),
            ReviewStatus::Rejected => Ok(ReviewDecision::Rejected { accuracy_score }),
        }
    }

    fn accuracy_score(&self) -> Option<f64> {
        match self {
            ReviewDecision::Approved { accuracy_score } => Some(*accuracy_score),
            ReviewDecision::Rejected { accuracy_score } => *accuracy_score,
        }
    }
}

/// Review outcome as sent by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Approved,
    Rejected,
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            other => Err(format!("Invalid review status: {}", other)),
        }
    }
}

/// Review request
#[derive(Debug, Clone)]
pub struct ReviewSubmission {
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    pub decision: ReviewDecision,
    pub feedback: Option<String>,
}

/// Applies a review and settles the trainer's earnings
///
/// # Errors
///
/// - [`LedgerError::InvalidAccuracyScore`] for a score outside 0..=100
/// - [`LedgerError::SubmissionNotFound`] for an unknown submission
/// - [`LedgerError::NotTaskOwner`] if the reviewer does not own the task
/// - [`LedgerError::AlreadyReviewed`] if the submission is no longer pending
pub async fn review_submission(
    pool: &PgPool,
    review: ReviewSubmission,
) -> Result<Submission, LedgerError> {
    let score = review.decision.accuracy_score();
    if score.is_some_and(|s| !(0.0..=100.0).contains(&s) || s.is_nan()) {
        return Err(LedgerError::InvalidAccuracyScore);
    }

    let mut tx = pool.begin().await?;

    let submission = Submission::lock_for_update(&mut *tx, review.submission_id)
        .await?
        .ok_or(LedgerError::SubmissionNotFound)?;

    let owner = Task::owner_id(&mut *tx, submission.task_id).await?;
    if owner != Some(review.reviewer_id) {
        return Err(LedgerError::NotTaskOwner);
    }

    if submission.status != SubmissionStatus::PendingReview {
        return Err(LedgerError::AlreadyReviewed {
            status: submission.status.to_string(),
        });
    }

    let trainer = User::lock_for_update(&mut *tx, submission.user_id)
        .await?
        .ok_or(LedgerError::UserNotFound)?;

    let amount = submission.payment_amount_cents;

    let reviewed = match review.decision {
        ReviewDecision::Approved { accuracy_score } => {
            let rating = running_accuracy(
                trainer.accuracy_rating,
                trainer.tasks_completed,
                accuracy_score,
            );
            User::settle_approval(&mut *tx, trainer.id, amount, rating).await?;

            let reviewed = Submission::mark_reviewed(
                &mut *tx,
                submission.id,
                ReviewRecord {
                    status: SubmissionStatus::Approved,
                    accuracy_score: Some(accuracy_score),
                    feedback: review.feedback,
                    reviewed_by: review.reviewer_id,
                    payment_amount_cents: amount,
                },
            )
            .await?;

            if submission.commission_cents > 0 {
                CommissionTransaction::record(
                    &mut *tx,
                    NewCommissionTransaction {
                        submission_id: submission.id,
                        task_id: submission.task_id,
                        trainer_id: trainer.id,
                        commission_cents: submission.commission_cents,
                        trainer_payout_cents: amount,
                    },
                )
                .await?;
            }

            reviewed
        }
        ReviewDecision::Rejected { accuracy_score } => {
            User::release_pending(&mut *tx, trainer.id, amount).await?;

            Submission::mark_reviewed(
                &mut *tx,
                submission.id,
                ReviewRecord {
                    status: SubmissionStatus::Rejected,
                    accuracy_score,
                    feedback: review.feedback,
                    reviewed_by: review.reviewer_id,
                    payment_amount_cents: 0,
                },
            )
            .await?
        }
    };

    tx.commit().await?;

    tracing::info!(
        submission_id = %reviewed.id,
        reviewer_id = %review.reviewer_id,
        trainer_id = %trainer.id,
        status = %reviewed.status,
        amount_cents = amount,
        "Submission reviewed"
    );

    Ok(reviewed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_requires_score() {
        assert!(matches!(
            ReviewDecision::from_parts(ReviewStatus::Approved, None),
            Err(LedgerError::MissingAccuracyScore)
        ));
        assert_eq!(
            ReviewDecision::from_parts(ReviewStatus::Approved, Some(90.0)).unwrap(),
            ReviewDecision::Approved { accuracy_score: 90.0 }
        );
        assert_eq!(
            ReviewDecision::from_parts(ReviewStatus::Rejected, None).unwrap(),
            ReviewDecision::Rejected { accuracy_score: None }
        );
    }

    #[test]
    fn test_review_status_from_str() {
        assert_eq!("approved".parse::<ReviewStatus>().unwrap(), ReviewStatus::Approved);
        assert_eq!("rejected".parse::<ReviewStatus>().unwrap(), ReviewStatus::Rejected);
        assert!("pending_review".parse::<ReviewStatus>().is_err());
    }
}
