/// Admin endpoints: monetization, analytics and payout settlement
///
/// # Endpoints
///
/// - `GET /api/admin/monetization` - All strategies
/// - `PATCH /api/admin/monetization/:key/toggle` - Enable or disable a strategy
/// - `PATCH /api/admin/monetization/:key/config` - Replace a strategy's config
/// - `GET /api/admin/revenue` - Commission and subscription revenue
/// - `GET /api/admin/users` - Users (`?role=&limit=&offset=`)
/// - `GET /api/admin/subscription-plans` - Every plan
/// - `POST /api/admin/payments/:id/settle` - Mark a pending payout completed or failed
///
/// Strategy writes invalidate the settings cache so the change applies to the
/// next request.

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
use serde_json::Value as JsonValue;
use train_shared::{
    auth::{
        authorization::{require_capability, Capability},
        middleware::AuthContext,
    },
    ledger::withdrawal::{settle_withdrawal, PayoutOutcome},
    models::{
        monetization::{
            CommissionTransaction, MonetizationSettingRow, PlatformTotals, RevenuePeriod,
        },
        payment::Payment,
        subscription::{PlanRevenue, SubscriptionPlan},
        user::{User, UserRole},
    },
    monetization::{StrategyConfig, StrategyKey},
};
use uuid::Uuid;
use validator::Validate;

/// Config update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateConfigRequest {
    /// New config; must match the strategy's schema
    pub config: JsonValue,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

/// Revenue analytics response
#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    pub platform: PlatformTotals,
    pub today: RevenuePeriod,
    pub monthly_commission: Vec<RevenuePeriod>,
    pub subscriptions: Vec<PlanRevenue>,
    pub subscription_mrr_cents: i64,
}

/// User listing query
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<UserRole>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Settlement request
#[derive(Debug, Deserialize, Validate)]
pub struct SettlePaymentRequest {
    pub outcome: PayoutOutcome,

    #[validate(length(min = 1, max = 255, message = "Provider reference must be 1-255 characters"))]
    pub provider_reference: Option<String>,
}

fn parse_key(key: &str) -> ApiResult<StrategyKey> {
    Ok(key.parse::<StrategyKey>()?)
}

/// All monetization strategies
pub async fn list_strategies(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<MonetizationSettingRow>>> {
    require_capability(&auth, Capability::ManageMonetization)?;

    Ok(Json(MonetizationSettingRow::list_all(&state.db).await?))
}

/// Flips a strategy on or off
///
/// # Errors
///
/// - `404 Not Found`: Unknown strategy key
pub async fn toggle_strategy(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(key): Path<String>,
) -> ApiResult<Json<MonetizationSettingRow>> {
    require_capability(&auth, Capability::ManageMonetization)?;
    let key = parse_key(&key)?;

    let row = MonetizationSettingRow::toggle(&state.db, key.as_str())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Strategy {} not found", key)))?;

    state.settings.invalidate();

    tracing::info!(
        strategy = %key,
        enabled = row.is_enabled,
        admin_id = %auth.user_id,
        "Monetization strategy toggled"
    );

    Ok(Json(row))
}

/// Replaces a strategy's config after checking it against the strategy's schema
///
/// # Errors
///
/// - `404 Not Found`: Unknown strategy key
/// - `422 Unprocessable Entity`: Config does not match the strategy
pub async fn update_strategy_config(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(key): Path<String>,
    Json(req): Json<UpdateConfigRequest>,
) -> ApiResult<Json<MonetizationSettingRow>> {
    require_capability(&auth, Capability::ManageMonetization)?;
    req.validate()?;
    let key = parse_key(&key)?;

    let config = StrategyConfig::parse(key, req.config)?;

    let row = MonetizationSettingRow::update_config(
        &state.db,
        key.as_str(),
        config.to_json(),
        req.notes,
    )
    .await?
        .ok_or_else(|| ApiError::NotFound(format!("Strategy {} not found", key)))?;

    state.settings.invalidate();

    tracing::info!(strategy = %key, admin_id = %auth.user_id, "Monetization config updated");

    Ok(Json(row))
}

/// Revenue analytics
pub async fn revenue(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<RevenueResponse>> {
    require_capability(&auth, Capability::ViewPlatformAnalytics)?;

    let platform = CommissionTransaction::platform_totals(&state.db).await?;
    let today = CommissionTransaction::today(&state.db).await?;
    let monthly_commission = CommissionTransaction::monthly(&state.db).await?;
    let subscriptions = SubscriptionPlan::revenue_breakdown(&state.db).await?;
    let subscription_mrr_cents = subscriptions.iter().map(|p| p.monthly_revenue_cents).sum();

    Ok(Json(RevenueResponse {
        platform,
        today,
        monthly_commission,
        subscriptions,
        subscription_mrr_cents,
    }))
}

/// Users, newest first
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Page<User>>> {
    require_capability(&auth, Capability::ViewPlatformAnalytics)?;

    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    }
    .resolve();

    let items = User::list(&state.db, query.role, page.0, page.1).await?;
    let total = User::count(&state.db, query.role).await?;

    Ok(Json(Page::new(items, total, page)))
}

/// Every subscription plan, including retired ones
pub async fn list_plans(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<SubscriptionPlan>>> {
    require_capability(&auth, Capability::ViewPlatformAnalytics)?;

    Ok(Json(SubscriptionPlan::list_all(&state.db).await?))
}

/// Settles a pending withdrawal
///
/// # Errors
///
/// - `404 Not Found`: Unknown payment
/// - `409 Conflict`: Payment already settled
pub async fn settle_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<SettlePaymentRequest>,
) -> ApiResult<Json<Payment>> {
    require_capability(&auth, Capability::SettlePayouts)?;
    req.validate()?;

    let payment = settle_withdrawal(&state.db, id, req.outcome, req.provider_reference).await?;

    Ok(Json(payment))
}
