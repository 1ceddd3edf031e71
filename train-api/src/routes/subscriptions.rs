/// Subscription endpoints
///
/// # Endpoints
///
/// - `GET /api/subscriptions/plans` - Purchasable plans (public)
/// - `GET /api/subscriptions/my-subscription` - Caller's active subscription
/// - `POST /api/subscriptions/subscribe` - Subscribe, replacing any active plan
/// - `DELETE /api/subscriptions/cancel` - Cancel the active plan
///
/// Company plans are offered only while `company_subscriptions` is enabled.
/// Paid trainer plans need `premium_trainers`; free plans are always offered.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use train_shared::{
    auth::middleware::AuthContext,
    models::{
        subscription::{PlanType, SubscriptionPlan, UserSubscription},
        user::UserRole,
    },
    monetization::{reader::SettingsSnapshot, StrategyConfig, StrategyKey},
};
use uuid::Uuid;

/// Plans response
#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<SubscriptionPlan>,

    /// Trial length for company plans, when offered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_trial_days: Option<u32>,
}

/// Active subscription response
#[derive(Debug, Serialize)]
pub struct MySubscriptionResponse {
    pub subscription: Option<UserSubscription>,
}

/// Subscribe request
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub plan_id: Uuid,
}

/// Cancel response
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

fn plan_offered(settings: &SettingsSnapshot, plan: &SubscriptionPlan) -> bool {
    match plan.plan_type {
        PlanType::Company => settings.is_enabled(StrategyKey::CompanySubscriptions),
        PlanType::Trainer => plan.is_free() || settings.is_enabled(StrategyKey::PremiumTrainers),
    }
}

fn plan_matches_role(plan: &SubscriptionPlan, role: UserRole) -> bool {
    matches!(
        (plan.plan_type, role),
        (PlanType::Company, UserRole::Client) | (PlanType::Trainer, UserRole::User)
    )
}

/// Plans currently on offer
pub async fn list_plans(State(state): State<AppState>) -> ApiResult<Json<PlansResponse>> {
    let settings = state.settings.snapshot().await?;

    let plans = SubscriptionPlan::list_active(&state.db)
        .await?
        .into_iter()
        .filter(|plan| plan_offered(&settings, plan))
        .collect();

    let company_trial_days = settings
        .get(StrategyKey::CompanySubscriptions)
        .filter(|s| s.enabled)
        .and_then(|s| match &s.config {
            StrategyConfig::CompanySubscriptions(c) => Some(c.trial_days),
            _ => None,
        });

    Ok(Json(PlansResponse {
        plans,
        company_trial_days,
    }))
}

/// Caller's active subscription, `null` when none
pub async fn my_subscription(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<MySubscriptionResponse>> {
    let subscription = UserSubscription::find_active(&state.db, auth.user_id).await?;

    Ok(Json(MySubscriptionResponse { subscription }))
}

/// Subscribes to a plan
///
/// # Errors
///
/// - `400 Bad Request`: Plan not offered, or meant for the other account type
/// - `404 Not Found`: Unknown or retired plan
pub async fn subscribe(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SubscribeRequest>,
) -> ApiResult<(StatusCode, Json<UserSubscription>)> {
    let plan = SubscriptionPlan::find_active(&state.db, req.plan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Plan not found".to_string()))?;

    if !plan_matches_role(&plan, auth.role) {
        return Err(ApiError::BadRequest(
            "Plan is not available for your account type".to_string(),
        ));
    }

    let settings = state.settings.snapshot().await?;
    if !plan_offered(&settings, &plan) {
        return Err(ApiError::BadRequest(
            "Plan is not currently offered".to_string(),
        ));
    }

    let subscription = UserSubscription::subscribe(&state.db, auth.user_id, plan.id).await?;

    tracing::info!(
        user_id = %auth.user_id,
        plan = %plan.name,
        price_cents = plan.price_monthly_cents,
        "Subscription started"
    );

    Ok((StatusCode::CREATED, Json(subscription)))
}

/// Cancels the active subscription
///
/// # Errors
///
/// - `404 Not Found`: No active subscription
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<CancelResponse>> {
    if !UserSubscription::cancel_active(&state.db, auth.user_id).await? {
        return Err(ApiError::NotFound("No active subscription".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, "Subscription cancelled");

    Ok(Json(CancelResponse { cancelled: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use train_shared::models::monetization::MonetizationSettingRow;

    fn plan(plan_type: PlanType, price: i64) -> SubscriptionPlan {
        SubscriptionPlan {
            id: Uuid::new_v4(),
            name: "Plan".to_string(),
            plan_type,
            price_monthly_cents: price,
            features: vec![],
            payment_bonus: 0.0,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn snapshot(company: bool, premium: bool) -> SettingsSnapshot {
        let row = |key: &str, enabled: bool, config: serde_json::Value| MonetizationSettingRow {
            strategy_key: key.to_string(),
            strategy_name: key.to_string(),
            is_enabled: enabled,
            config,
            notes: None,
            enabled_at: None,
            updated_at: Utc::now(),
        };

        SettingsSnapshot::from_rows(vec![
            row("company_subscriptions", company, json!({"trial_days": 14})),
            row("premium_trainers", premium, json!({"max_payment_bonus": 0.10})),
        ])
    }

    #[test]
    fn test_plan_offered() {
        let off = snapshot(false, false);
        assert!(!plan_offered(&off, &plan(PlanType::Company, 4900)));
        assert!(!plan_offered(&off, &plan(PlanType::Trainer, 999)));
        assert!(plan_offered(&off, &plan(PlanType::Trainer, 0)));

        let on = snapshot(true, true);
        assert!(plan_offered(&on, &plan(PlanType::Company, 4900)));
        assert!(plan_offered(&on, &plan(PlanType::Trainer, 999)));
    }

    #[test]
    fn test_plan_matches_role() {
        assert!(plan_matches_role(&plan(PlanType::Company, 4900), UserRole::Client));
        assert!(plan_matches_role(&plan(PlanType::Trainer, 999), UserRole::User));
        assert!(!plan_matches_role(&plan(PlanType::Company, 4900), UserRole::User));
        assert!(!plan_matches_role(&plan(PlanType::Trainer, 0), UserRole::Admin));
    }
}
