/// Monetization settings rows and platform revenue records
///
/// `monetization_settings` holds one row per strategy. Its `config` column is
/// raw JSON here; [`crate::monetization::StrategyConfig`] is the typed view.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE monetization_settings (
///     strategy_key VARCHAR(64) PRIMARY KEY,
///     strategy_name VARCHAR(128) NOT NULL,
///     is_enabled BOOLEAN NOT NULL DEFAULT FALSE,
///     config JSONB NOT NULL DEFAULT '{}',
///     notes TEXT,
///     enabled_at TIMESTAMPTZ,
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE commission_transactions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     submission_id UUID NOT NULL UNIQUE REFERENCES submissions(id),
///     task_id UUID NOT NULL REFERENCES tasks(id),
///     trainer_id UUID NOT NULL REFERENCES users(id),
///     gross_amount_cents BIGINT NOT NULL,
///     commission_rate DOUBLE PRECISION NOT NULL,
///     commission_cents BIGINT NOT NULL,
///     trainer_payout_cents BIGINT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Raw strategy settings row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MonetizationSettingRow {
    pub strategy_key: String,
    pub strategy_name: String,
    pub is_enabled: bool,
    pub config: JsonValue,
    pub notes: Option<String>,
    pub enabled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl MonetizationSettingRow {
    /// All strategies in display order
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MonetizationSettingRow>(
            r#"
            SELECT * FROM monetization_settings
            ORDER BY CASE strategy_key
                WHEN 'platform_commission' THEN 1
                WHEN 'company_subscriptions' THEN 2
                WHEN 'premium_trainers' THEN 3
                WHEN 'data_quality_guarantee' THEN 4
                WHEN 'featured_listings' THEN 5
                WHEN 'api_access' THEN 6
                ELSE 7
            END
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Flips `is_enabled`, stamping `enabled_at` when turning on
    pub async fn toggle(pool: &PgPool, strategy_key: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MonetizationSettingRow>(
            r#"
            UPDATE monetization_settings
            SET is_enabled = NOT is_enabled,
                enabled_at = CASE WHEN NOT is_enabled THEN NOW() ELSE enabled_at END,
                updated_at = NOW()
            WHERE strategy_key = $1
            RETURNING *
            "#,
        )
        .bind(strategy_key)
        .fetch_optional(pool)
        .await
    }

    /// Replaces the config JSON (and notes when given)
    pub async fn update_config(
        pool: &PgPool,
        strategy_key: &str,
        config: JsonValue,
        notes: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MonetizationSettingRow>(
            r#"
            UPDATE monetization_settings
            SET config = $2, notes = COALESCE($3, notes), updated_at = NOW()
            WHERE strategy_key = $1
            RETURNING *
            "#,
        )
        .bind(strategy_key)
        .bind(config)
        .bind(notes)
        .fetch_optional(pool)
        .await
    }
}

/// Platform revenue from one approved submission
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommissionTransaction {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub task_id: Uuid,
    pub trainer_id: Uuid,
    pub gross_amount_cents: i64,
    pub commission_rate: f64,
    pub commission_cents: i64,
    pub trainer_payout_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for recording platform revenue
#[derive(Debug, Clone)]
pub struct NewCommissionTransaction {
    pub submission_id: Uuid,
    pub task_id: Uuid,
    pub trainer_id: Uuid,
    pub commission_cents: i64,
    pub trainer_payout_cents: i64,
}

/// Marketplace-wide counts and revenue
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PlatformTotals {
    pub total_trainers: i64,
    pub total_clients: i64,
    pub total_tasks: i64,
    pub total_submissions: i64,
    pub total_commission_cents: i64,
    pub total_gross_volume_cents: i64,
}

/// Commission revenue for one period
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RevenuePeriod {
    pub period: NaiveDate,
    pub transactions: i64,
    pub commission_cents: i64,
    pub gross_volume_cents: i64,
}

impl CommissionTransaction {
    /// Records the split of an approved submission
    pub async fn record(
        conn: &mut PgConnection,
        data: NewCommissionTransaction,
    ) -> Result<Self, sqlx::Error> {
        let gross = data.commission_cents + data.trainer_payout_cents;
        let rate = if gross > 0 {
            data.commission_cents as f64 / gross as f64
        } else {
            0.0
        };

        sqlx::query_as::<_, CommissionTransaction>(
            r#"
            INSERT INTO commission_transactions (
                submission_id, task_id, trainer_id, gross_amount_cents,
                commission_rate, commission_cents, trainer_payout_cents
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(data.submission_id)
        .bind(data.task_id)
        .bind(data.trainer_id)
        .bind(gross)
        .bind(rate)
        .bind(data.commission_cents)
        .bind(data.trainer_payout_cents)
        .fetch_one(conn)
        .await
    }

    /// Counts across users, tasks, submissions and commissions
    pub async fn platform_totals(pool: &PgPool) -> Result<PlatformTotals, sqlx::Error> {
        sqlx::query_as::<_, PlatformTotals>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE role = 'user') AS total_trainers,
                (SELECT COUNT(*) FROM users WHERE role = 'client') AS total_clients,
                (SELECT COUNT(*) FROM tasks) AS total_tasks,
                (SELECT COUNT(*) FROM submissions) AS total_submissions,
                (SELECT COALESCE(SUM(commission_cents), 0)::BIGINT FROM commission_transactions)
                    AS total_commission_cents,
                (SELECT COALESCE(SUM(gross_amount_cents), 0)::BIGINT FROM commission_transactions)
                    AS total_gross_volume_cents
            "#,
        )
        .fetch_one(pool)
        .await
    }

    /// Revenue recorded today
    pub async fn today(pool: &PgPool) -> Result<RevenuePeriod, sqlx::Error> {
        sqlx::query_as::<_, RevenuePeriod>(
            r#"
            SELECT CURRENT_DATE AS period,
                   COUNT(*) AS transactions,
                   COALESCE(SUM(commission_cents), 0)::BIGINT AS commission_cents,
                   COALESCE(SUM(gross_amount_cents), 0)::BIGINT AS gross_volume_cents
            FROM commission_transactions
            WHERE created_at >= CURRENT_DATE
            "#,
        )
        .fetch_one(pool)
        .await
    }

    /// Revenue per month for the last twelve months
    pub async fn monthly(pool: &PgPool) -> Result<Vec<RevenuePeriod>, sqlx::Error> {
        sqlx::query_as::<_, RevenuePeriod>(
            r#"
            SELECT date_trunc('month', created_at)::DATE AS period,
                   COUNT(*) AS transactions,
                   COALESCE(SUM(commission_cents), 0)::BIGINT AS commission_cents,
                   COALESCE(SUM(gross_amount_cents), 0)::BIGINT AS gross_volume_cents
            FROM commission_transactions
            GROUP BY 1
            ORDER BY 1 DESC
            LIMIT 12
            "#,
        )
        .fetch_all(pool)
        .await
    }
}
