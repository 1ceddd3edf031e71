/// Earnings ledger
///
/// Three flows move money between a trainer's aggregates. Each runs in one
/// database transaction and locks the rows it reads before writing:
///
/// - [`intake`]: submitted work credits `pending`
/// - [`review`]: approval moves `pending` to `total`, rejection drops it
/// - [`withdrawal`]: a request reserves part of `total` as `held`, settlement
///   either debits it or releases it
///
/// Lock order is always task, submission or payment first and the user row
/// last, so concurrent flows cannot deadlock on each other.
///
/// # Balance
///
/// ```text
/// available = max(0, total - pending - held)
/// ```
///
/// # Example
///
/// ```
/// use train_shared::ledger::{validate_withdrawal, Balance, LedgerError};
///
/// let balance = Balance { total_cents: 2_500, pending_cents: 1_000, held_cents: 0 };
/// assert_eq!(balance.available_cents(), 1_500);
///
/// let err = validate_withdrawal(2_000, balance.available_cents(), 1_000).unwrap_err();
/// assert!(matches!(err, LedgerError::InsufficientBalance { available_cents: 1_500 }));
/// ```

pub mod intake;
pub mod review;
pub mod withdrawal;

use serde::Serialize;

use crate::monetization::MonetizationError;

/// Smallest withdrawal accepted by default
pub const MIN_WITHDRAWAL_CENTS: i64 = 1_000;

/// A trainer may submit to the same task at most once per this window
pub const DUPLICATE_SUBMISSION_WINDOW_SECS: i64 = 3_600;

/// A trainer's earnings aggregates in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Balance {
    pub total_cents: i64,
    pub pending_cents: i64,
    pub held_cents: i64,
}

impl Balance {
    /// Amount that can be withdrawn right now
    pub fn available_cents(&self) -> i64 {
        (self.total_cents - self.pending_cents - self.held_cents).max(0)
    }
}

/// Ledger flow errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Task not found or no longer active")]
    TaskNotFound,

    #[error("Task has reached its submission limit")]
    TaskFull,

    #[error("You already submitted work for this task in the last hour")]
    DuplicateSubmission,

    #[error("Submission not found")]
    SubmissionNotFound,

    #[error("Only the task owner can review its submissions")]
    NotTaskOwner,

    #[error("Submission has already been reviewed (status: {status})")]
    AlreadyReviewed { status: String },

    #[error("Approving a submission requires an accuracy score")]
    MissingAccuracyScore,

    #[error("Accuracy score must be between 0 and 100")]
    InvalidAccuracyScore,

    #[error("Withdrawal amount must be positive")]
    InvalidAmount,

    #[error("Insufficient balance. Available: {}", format_cents(*available_cents))]
    InsufficientBalance { available_cents: i64 },

    #[error("Minimum withdrawal amount is {}", format_cents(*minimum_cents))]
    BelowMinimum { minimum_cents: i64 },

    #[error("User not found")]
    UserNotFound,

    #[error("Payment not found")]
    PaymentNotFound,

    #[error("Payment has already been settled (status: {status})")]
    PaymentAlreadySettled { status: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Monetization(#[from] MonetizationError),
}

/// Folds an approved score into a running accuracy average
///
/// `approved` is the number of scores already in `current`. The result is
/// rounded to two decimals.
pub fn running_accuracy(current: f64, approved: i32, score: f64) -> f64 {
    let n = approved.max(0) as f64;
    let next = (current * n + score) / (n + 1.0);
    (next * 100.0).round() / 100.0
}

/// Checks a withdrawal amount against the available balance and the minimum
///
/// Checked in order: positive amount, sufficient balance, minimum amount.
pub fn validate_withdrawal(
    amount_cents: i64,
    available_cents: i64,
    minimum_cents: i64,
) -> Result<(), LedgerError> {
    if amount_cents <= 0 {
        return Err(LedgerError::InvalidAmount);
    }

    if amount_cents > available_cents {
        return Err(LedgerError::InsufficientBalance { available_cents });
    }

    if amount_cents < minimum_cents {
        return Err(LedgerError::BelowMinimum { minimum_cents });
    }

    Ok(())
}

/// Formats cents as dollars, e.g. `1500` as `$15.00`
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}
