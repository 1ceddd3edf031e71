/// Payment model: the append-only payout ledger
///
/// Rows are inserted as `pending` withdrawals. The only mutation ever applied
/// is settling a pending row to `completed` or `failed`, once.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE payments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id),
///     transaction_type transaction_type NOT NULL DEFAULT 'withdrawal',
///     amount_cents BIGINT NOT NULL CHECK (amount_cents > 0),
///     status payment_status NOT NULL DEFAULT 'pending',
///     payment_method VARCHAR(50) NOT NULL DEFAULT 'stripe',
///     description TEXT,
///     provider_reference VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     processed_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Default payout rail
pub const DEFAULT_PAYMENT_METHOD: &str = "stripe";

/// Ledger entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Withdrawal,
}

/// Payout state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payout ledger row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub description: Option<String>,

    /// Identifier from the payout provider, set on settlement
    pub provider_reference: Option<String>,

    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Inserts a pending withdrawal
    pub async fn create_withdrawal(
        conn: &mut PgConnection,
        user_id: Uuid,
        amount_cents: i64,
        payment_method: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (user_id, transaction_type, amount_cents, payment_method, description)
            VALUES ($1, 'withdrawal', $2, $3, 'Withdrawal request')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(amount_cents)
        .bind(payment_method)
        .fetch_one(conn)
        .await
    }

    /// Locks the payment row for the rest of the transaction
    pub async fn lock_for_update(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Moves a pending row to its final status
    pub async fn mark_processed(
        conn: &mut PgConnection,
        id: Uuid,
        status: PaymentStatus,
        provider_reference: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $2, provider_reference = $3, processed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(provider_reference)
        .fetch_one(conn)
        .await
    }

    /// A user's payments, newest first
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Number of a user's payments
    pub async fn count_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Sum of a user's completed withdrawals
    pub async fn total_withdrawn(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM payments
            WHERE user_id = $1 AND transaction_type = 'withdrawal' AND status = 'completed'
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
