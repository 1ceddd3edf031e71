/// User model and database operations
///
/// A user is a trainer (role `user`), a client posting tasks, or an admin.
/// Trainers carry three earnings aggregates in cents:
///
/// - `total_earnings_cents`: approved work, not yet paid out
/// - `pending_earnings_cents`: submitted work awaiting review
/// - `held_earnings_cents`: part of `total` reserved by pending withdrawals
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(50) NOT NULL,
///     last_name VARCHAR(50) NOT NULL,
///     role user_role NOT NULL DEFAULT 'user',
///     company_name VARCHAR(255),
///     phone_number VARCHAR(32),
///     preferred_language VARCHAR(10) NOT NULL DEFAULT 'en',
///     skill_categories TEXT[] NOT NULL DEFAULT '{}',
///     total_earnings_cents BIGINT NOT NULL DEFAULT 0,
///     pending_earnings_cents BIGINT NOT NULL DEFAULT 0,
///     held_earnings_cents BIGINT NOT NULL DEFAULT 0,
///     accuracy_rating DOUBLE PRECISION NOT NULL DEFAULT 0,
///     tasks_completed INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use train_shared::models::user::{CreateUser, User, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(
///     &pool,
///     CreateUser {
///         email: "trainer@example.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///         first_name: "Ada".to_string(),
///         last_name: "Lovelace".to_string(),
///         role: UserRole::User,
///         company_name: None,
///     },
/// )
/// .await?;
///
/// let found = User::find_by_email(&pool, "trainer@example.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::ledger::Balance;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Trainer completing micro-tasks
    User,

    /// Company posting tasks and reviewing work
    Client,

    /// Platform operator
    Admin,
}

impl UserRole {
    /// Converts role to its database string
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Client => "client",
            UserRole::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Email address, stored lowercase
    pub email: String,

    /// Argon2id password hash, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,

    /// Account role
    pub role: UserRole,

    /// Company name (clients only)
    pub company_name: Option<String>,

    pub phone_number: Option<String>,
    pub preferred_language: String,
    pub skill_categories: Vec<String>,

    /// Approved earnings not yet paid out
    pub total_earnings_cents: i64,

    /// Earnings awaiting review
    pub pending_earnings_cents: i64,

    /// Earnings reserved by pending withdrawals
    pub held_earnings_cents: i64,

    /// Running average of approved accuracy scores (0..=100)
    pub accuracy_rating: f64,

    /// Number of approved submissions
    pub tasks_completed: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Earnings aggregates as a ledger balance
    pub fn balance(&self) -> Balance {
        Balance {
            total_cents: self.total_earnings_cents,
            pending_cents: self.pending_earnings_cents,
            held_cents: self.held_earnings_cents,
        }
    }

    /// "First L." display form used on public listings
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name)
    }
}

/// Formats "First L." from a first and last name
pub fn display_name(first_name: &str, last_name: &str) -> String {
    match last_name.chars().next() {
        Some(initial) => format!("{} {}.", first_name, initial),
        None => first_name.to_string(),
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Email address (lowercased before insert)
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub company_name: Option<String>,
}

/// Profile fields a user may change; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub preferred_language: Option<String>,
    pub skill_categories: Option<Vec<String>>,
    pub company_name: Option<String>,
}

/// Leaderboard time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
    #[default]
    AllTime,
    Week,
    Month,
}

impl LeaderboardPeriod {
    /// `date_trunc` unit bounding the window, `None` for all time
    fn truncation_unit(&self) -> Option<&'static str> {
        match self {
            LeaderboardPeriod::AllTime => None,
            LeaderboardPeriod::Week => Some("week"),
            LeaderboardPeriod::Month => Some("month"),
        }
    }
}

/// One leaderboard row, ranked by approved earnings in the window
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeaderboardRow {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub accuracy_rating: f64,
    pub tasks_completed: i64,
    pub total_earned_cents: i64,
    pub average_accuracy: Option<f64>,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `users_email_key` when the email is taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role, company_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.email.to_lowercase())
        .bind(data.password_hash)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.role)
        .bind(data.company_name)
        .fetch_one(pool)
        .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(pool)
            .await
    }

    /// Stamps `last_login_at`
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Updates profile fields that are `Some`
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone_number = COALESCE($4, phone_number),
                preferred_language = COALESCE($5, preferred_language),
                skill_categories = COALESCE($6, skill_categories),
                company_name = COALESCE($7, company_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.phone_number)
        .bind(data.preferred_language)
        .bind(data.skill_categories)
        .bind(data.company_name)
        .fetch_optional(pool)
        .await
    }

    /// Lists users newest first, optionally filtered by role
    pub async fn list(
        pool: &PgPool,
        role: Option<UserRole>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(role)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Counts users, optionally filtered by role
    pub async fn count(pool: &PgPool, role: Option<UserRole>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1::user_role IS NULL OR role = $1)")
            .bind(role)
            .fetch_one(pool)
            .await
    }

    /// Top trainers by approved earnings within the period
    pub async fn leaderboard(
        pool: &PgPool,
        period: LeaderboardPeriod,
        limit: i64,
    ) -> Result<Vec<LeaderboardRow>, sqlx::Error> {
        sqlx::query_as::<_, LeaderboardRow>(
            r#"
            SELECT u.id AS user_id,
                   u.first_name,
                   u.last_name,
                   u.accuracy_rating,
                   COUNT(s.id) AS tasks_completed,
                   COALESCE(SUM(s.payment_amount_cents), 0)::BIGINT AS total_earned_cents,
                   AVG(s.accuracy_score)::FLOAT8 AS average_accuracy
            FROM users u
            JOIN submissions s ON s.user_id = u.id
            WHERE s.status = 'approved'
              AND ($1::TEXT IS NULL OR s.reviewed_at >= date_trunc($1, NOW()))
            GROUP BY u.id, u.first_name, u.last_name, u.accuracy_rating
            ORDER BY total_earned_cents DESC, tasks_completed DESC
            LIMIT $2
            "#,
        )
        .bind(period.truncation_unit())
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    // Ledger mutations. Each runs inside the caller's transaction and
    // expects the row to be locked already where a read preceded it.

    /// Locks the user row for the rest of the transaction
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Intake: `pending += amount`
    pub async fn credit_pending(
        conn: &mut PgConnection,
        id: Uuid,
        amount_cents: i64,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET pending_earnings_cents = pending_earnings_cents + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(amount_cents)
        .execute(conn)
        .await?;

        expect_one_row(result.rows_affected())
    }

    /// Approval: `total += amount`, `pending -= amount`, new rating, one more approved task
    pub async fn settle_approval(
        conn: &mut PgConnection,
        id: Uuid,
        amount_cents: i64,
        accuracy_rating: f64,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET total_earnings_cents = total_earnings_cents + $2,
                pending_earnings_cents = pending_earnings_cents - $2,
                accuracy_rating = $3,
                tasks_completed = tasks_completed + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(amount_cents)
        .bind(accuracy_rating)
        .execute(conn)
        .await?;

        expect_one_row(result.rows_affected())
    }

    /// Rejection: `pending -= amount`
    pub async fn release_pending(
        conn: &mut PgConnection,
        id: Uuid,
        amount_cents: i64,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET pending_earnings_cents = pending_earnings_cents - $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(amount_cents)
        .execute(conn)
        .await?;

        expect_one_row(result.rows_affected())
    }

    /// Withdrawal request: `held += amount`
    pub async fn hold_earnings(
        conn: &mut PgConnection,
        id: Uuid,
        amount_cents: i64,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET held_earnings_cents = held_earnings_cents + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(amount_cents)
        .execute(conn)
        .await?;

        expect_one_row(result.rows_affected())
    }

    /// Completed payout: `total -= amount`, `held -= amount`
    pub async fn complete_payout(
        conn: &mut PgConnection,
        id: Uuid,
        amount_cents: i64,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET total_earnings_cents = total_earnings_cents - $2,
                held_earnings_cents = held_earnings_cents - $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(amount_cents)
        .execute(conn)
        .await?;

        expect_one_row(result.rows_affected())
    }

    /// Failed payout: `held -= amount`
    pub async fn release_hold(
        conn: &mut PgConnection,
        id: Uuid,
        amount_cents: i64,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET held_earnings_cents = held_earnings_cents - $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(amount_cents)
        .execute(conn)
        .await?;

        expect_one_row(result.rows_affected())
    }
}

fn expect_one_row(rows_affected: u64) -> Result<(), sqlx::Error> {
    if rows_affected == 1 {
        Ok(())
    } else {
        Err(sqlx::Error::RowNotFound)
    }
}
