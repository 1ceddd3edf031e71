/// Withdrawals and payout settlement
///
/// A request never touches `total_earnings_cents`. It records a `pending`
/// payment and moves the amount into `held_earnings_cents`, which removes it
/// from the available balance. Settlement then either debits `total` and
/// `held` together (completed) or releases the hold (failed).

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{validate_withdrawal, LedgerError};
use crate::models::payment::{Payment, PaymentStatus};
use crate::models::user::User;

/// Withdrawal request
#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub payment_method: String,

    /// Configured minimum withdrawal
    pub minimum_cents: i64,
}

/// Final state reported by the payout provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutOutcome {
    Completed,
    Failed,
}

impl PayoutOutcome {
    fn status(self) -> PaymentStatus {
        match self {
            PayoutOutcome::Completed => PaymentStatus::Completed,
            PayoutOutcome::Failed => PaymentStatus::Failed,
        }
    }
}

/// Reserves earnings for a payout and records a pending payment
///
/// # Errors
///
/// - [`LedgerError::InvalidAmount`] for a non-positive amount
/// - [`LedgerError::InsufficientBalance`] if the amount exceeds the available balance
/// - [`LedgerError::BelowMinimum`] if the amount is under the minimum
pub async fn request_withdrawal(
    pool: &PgPool,
    request: WithdrawalRequest,
) -> Result<Payment, LedgerError> {
    let mut tx = pool.begin().await?;

    let user = User::lock_for_update(&mut *tx, request.user_id)
        .await?
        .ok_or(LedgerError::UserNotFound)?;

    validate_withdrawal(
        request.amount_cents,
        user.balance().available_cents(),
        request.minimum_cents,
    )?;

    let payment = Payment::create_withdrawal(
        &mut *tx,
        user.id,
        request.amount_cents,
        &request.payment_method,
    )
    .await?;

    User::hold_earnings(&mut *tx, user.id, request.amount_cents).await?;

    tx.commit().await?;

    tracing::info!(
        payment_id = %payment.id,
        user_id = %user.id,
        amount_cents = payment.amount_cents,
        method = %payment.payment_method,
        "Withdrawal requested"
    );

    Ok(payment)
}

/// Settles a pending withdrawal
///
/// # Errors
///
/// - [`LedgerError::PaymentNotFound`] for an unknown payment
/// - [`LedgerError::PaymentAlreadySettled`] if the payment is not pending
pub async fn settle_withdrawal(
    pool: &PgPool,
    payment_id: Uuid,
    outcome: PayoutOutcome,
    provider_reference: Option<String>,
) -> Result<Payment, LedgerError> {
    let mut tx = pool.begin().await?;

    let payment = Payment::lock_for_update(&mut *tx, payment_id)
        .await?
        .ok_or(LedgerError::PaymentNotFound)?;

    if payment.status != PaymentStatus::Pending {
        return Err(LedgerError::PaymentAlreadySettled {
            status: payment.status.to_string(),
        });
    }

    User::lock_for_update(&mut *tx, payment.user_id)
        .await?
        .ok_or(LedgerError::UserNotFound)?;

    match outcome {
        PayoutOutcome::Completed => {
            User::complete_payout(&mut *tx, payment.user_id, payment.amount_cents).await?
        }
        PayoutOutcome::Failed => {
            User::release_hold(&mut *tx, payment.user_id, payment.amount_cents).await?
        }
    }

    let settled =
        Payment::mark_processed(&mut *tx, payment.id, outcome.status(), provider_reference).await?;

    tx.commit().await?;

    tracing::info!(
        payment_id = %settled.id,
        user_id = %settled.user_id,
        amount_cents = settled.amount_cents,
        status = %settled.status,
        "Withdrawal settled"
    );

    Ok(settled)
}
