/// Subscription plans and user subscriptions
///
/// Company plans unlock client features, trainer plans carry a
/// `payment_bonus` that lowers the platform commission on their work.
/// A user holds at most one active subscription (partial unique index).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Billing period length for new subscriptions
pub const BILLING_PERIOD_DAYS: i64 = 30;

/// Audience of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Company,
    Trainer,
}

/// Subscription state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
}

/// Purchasable plan
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub plan_type: PlanType,
    pub price_monthly_cents: i64,
    pub features: Vec<String>,

    /// Commission-rate reduction for trainer plans (0.05 = 5 points)
    pub payment_bonus: f64,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionPlan {
    pub fn is_free(&self) -> bool {
        self.price_monthly_cents == 0
    }
}

/// A user's subscription joined with its plan
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub plan_name: String,
    pub plan_type: PlanType,
    pub price_monthly_cents: i64,
    pub features: Vec<String>,
    pub payment_bonus: f64,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Active subscribers and monthly revenue per plan
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PlanRevenue {
    pub plan_name: String,
    pub plan_type: PlanType,
    pub price_monthly_cents: i64,
    pub subscriber_count: i64,
    pub monthly_revenue_cents: i64,
}

const USER_SUBSCRIPTION_SELECT: &str = r#"
    SELECT us.id, us.user_id, us.plan_id,
           sp.name AS plan_name, sp.plan_type, sp.price_monthly_cents,
           sp.features, sp.payment_bonus,
           us.status, us.current_period_start, us.current_period_end,
           us.created_at, us.cancelled_at
    FROM user_subscriptions us
    JOIN subscription_plans sp ON sp.id = us.plan_id
"#;

impl SubscriptionPlan {
    /// Plans open for purchase, by type then price
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE is_active = TRUE ORDER BY plan_type, price_monthly_cents",
        )
        .fetch_all(pool)
        .await
    }

    /// Every plan including retired ones
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans ORDER BY plan_type, price_monthly_cents",
        )
        .fetch_all(pool)
        .await
    }

    /// Finds an active plan by ID
    pub async fn find_active(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Subscriber counts and revenue per plan
    pub async fn revenue_breakdown(pool: &PgPool) -> Result<Vec<PlanRevenue>, sqlx::Error> {
        sqlx::query_as::<_, PlanRevenue>(
            r#"
            SELECT sp.name AS plan_name,
                   sp.plan_type,
                   sp.price_monthly_cents,
                   COUNT(us.id) AS subscriber_count,
                   (COUNT(us.id) * sp.price_monthly_cents)::BIGINT AS monthly_revenue_cents
            FROM subscription_plans sp
            LEFT JOIN user_subscriptions us ON us.plan_id = sp.id AND us.status = 'active'
            GROUP BY sp.id, sp.name, sp.plan_type, sp.price_monthly_cents
            ORDER BY sp.plan_type, sp.price_monthly_cents
            "#,
        )
        .fetch_all(pool)
        .await
    }
}

impl UserSubscription {
    /// The user's active subscription, if any
    pub async fn find_active(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "{} WHERE us.user_id = $1 AND us.status = 'active'",
            USER_SUBSCRIPTION_SELECT
        );

        sqlx::query_as::<_, UserSubscription>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Payment bonus of the user's active plan, 0 without one
    pub async fn active_payment_bonus(conn: &mut PgConnection, user_id: Uuid) -> Result<f64, sqlx::Error> {
        let bonus: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT sp.payment_bonus
            FROM user_subscriptions us
            JOIN subscription_plans sp ON sp.id = us.plan_id
            WHERE us.user_id = $1 AND us.status = 'active'
            "#,
        )
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(bonus.unwrap_or(0.0))
    }

    /// Replaces any active subscription with a fresh one-period subscription
    pub async fn subscribe(pool: &PgPool, user_id: Uuid, plan_id: Uuid) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE user_subscriptions
            SET status = 'cancelled', cancelled_at = NOW()
            WHERE user_id = $1 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let period_start = Utc::now();
        let period_end = period_start + Duration::days(BILLING_PERIOD_DAYS);

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO user_subscriptions (user_id, plan_id, current_period_start, current_period_end)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(plan_id)
        .bind(period_start)
        .bind(period_end)
        .fetch_one(&mut *tx)
        .await?;

        let query = format!("{} WHERE us.id = $1", USER_SUBSCRIPTION_SELECT);
        let subscription = sqlx::query_as::<_, UserSubscription>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(subscription)
    }

    /// Cancels the active subscription; returns false when there was none
    pub async fn cancel_active(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE user_subscriptions
            SET status = 'cancelled', cancelled_at = NOW()
            WHERE user_id = $1 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
