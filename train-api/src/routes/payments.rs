/// Balance, payout history and withdrawal endpoints
///
/// # Endpoints
///
/// - `GET /api/payments/balance` - Earnings aggregates and available balance
/// - `GET /api/payments/history` - Own payments, newest first
/// - `POST /api/payments/withdraw` - Request a payout
/// - `GET /api/payments/earnings-breakdown` - Approved earnings by task type and month

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{Page, Pagination},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use train_shared::{
    auth::{
        authorization::{require_capability, Capability},
        middleware::AuthContext,
    },
    ledger::withdrawal::{request_withdrawal, WithdrawalRequest},
    models::{
        payment::{Payment, DEFAULT_PAYMENT_METHOD},
        submission::{MonthlyEarnings, Submission, TaskTypeEarnings},
        user::User,
    },
};
use validator::Validate;

/// Balance response
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub total_earnings_cents: i64,
    pub pending_earnings_cents: i64,
    pub held_earnings_cents: i64,
    pub available_balance_cents: i64,
    pub total_withdrawn_cents: i64,
    pub minimum_withdrawal_cents: i64,
}

/// Withdrawal request body
#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawRequest {
    pub amount_cents: i64,

    #[validate(length(min = 1, max = 50, message = "Payment method must be 1-50 characters"))]
    pub payment_method: Option<String>,
}

/// Earnings breakdown response
#[derive(Debug, Serialize)]
pub struct EarningsBreakdownResponse {
    pub by_task_type: Vec<TaskTypeEarnings>,
    pub by_month: Vec<MonthlyEarnings>,
}

/// Current balance
pub async fn get_balance(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<BalanceResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let total_withdrawn_cents = Payment::total_withdrawn(&state.db, user.id).await?;
    let balance = user.balance();

    Ok(Json(BalanceResponse {
        total_earnings_cents: balance.total_cents,
        pending_earnings_cents: balance.pending_cents,
        held_earnings_cents: balance.held_cents,
        available_balance_cents: balance.available_cents(),
        total_withdrawn_cents,
        minimum_withdrawal_cents: state.config.ledger.min_withdrawal_cents,
    }))
}

/// Payment history
pub async fn payment_history(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Page<Payment>>> {
    let page = pagination.resolve();

    let items = Payment::list_by_user(&state.db, auth.user_id, page.0, page.1).await?;
    let total = Payment::count_by_user(&state.db, auth.user_id).await?;

    Ok(Json(Page::new(items, total, page)))
}

/// Requests a withdrawal
///
/// The amount is held against the balance until an admin settles the payout.
///
/// # Errors
///
/// - `400 Bad Request`: Amount not positive, above the available balance,
///   or below the minimum
/// - `403 Forbidden`: Caller is not a trainer
pub async fn withdraw(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<WithdrawRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    require_capability(&auth, Capability::Withdraw)?;
    req.validate()?;

    let result = request_withdrawal(
        &state.db,
        WithdrawalRequest {
            user_id: auth.user_id,
            amount_cents: req.amount_cents,
            payment_method: req
                .payment_method
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            minimum_cents: state.config.ledger.min_withdrawal_cents,
        },
    )
    .await;

    match result {
        Ok(payment) => Ok((StatusCode::CREATED, Json(payment))),
        Err(e) => {
            tracing::warn!(user_id = %auth.user_id, amount_cents = req.amount_cents, error = %e, "Withdrawal rejected");
            Err(e.into())
        }
    }
}

/// Approved earnings grouped by task type and by month
pub async fn earnings_breakdown(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<EarningsBreakdownResponse>> {
    let by_task_type = Submission::earnings_by_task_type(&state.db, auth.user_id).await?;
    let by_month = Submission::earnings_by_month(&state.db, auth.user_id).await?;

    Ok(Json(EarningsBreakdownResponse {
        by_task_type,
        by_month,
    }))
}
