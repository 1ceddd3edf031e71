/// Profile, statistics and leaderboard endpoints
///
/// # Endpoints
///
/// - `GET /api/users/profile` - Own profile
/// - `PUT /api/users/profile` - Update own profile
/// - `GET /api/users/stats` - Own performance with a 30-day trend
/// - `GET /api/users/leaderboard` - Top trainers (`?period=all_time|week|month&limit=`)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use train_shared::{
    auth::middleware::AuthContext,
    models::{
        submission::{DailyPerformance, Submission, SubmissionTotals},
        user::{display_name, LeaderboardPeriod, UpdateProfile, User},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: Option<String>,

    #[validate(length(max = 32, message = "Phone number must be at most 32 characters"))]
    pub phone_number: Option<String>,

    #[validate(length(min = 2, max = 10, message = "Language must be 2-10 characters"))]
    pub preferred_language: Option<String>,

    #[validate(length(max = 20, message = "At most 20 skill categories"))]
    pub skill_categories: Option<Vec<String>>,

    #[validate(length(max = 255, message = "Company name must be at most 255 characters"))]
    pub company_name: Option<String>,
}

/// User stats response
#[derive(Debug, Serialize)]
pub struct UserStatsResponse {
    pub accuracy_rating: f64,
    pub tasks_completed: i32,
    pub member_since: DateTime<Utc>,
    pub all_time: SubmissionTotals,
    pub last_30_days: SubmissionTotals,
    pub performance_trend: Vec<DailyPerformance>,
}

/// Leaderboard query
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub period: LeaderboardPeriod,
    pub limit: Option<i64>,
}

/// One leaderboard entry; trainers are shown as "First L."
#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: Uuid,
    pub display_name: String,
    pub accuracy_rating: f64,
    pub tasks_completed: i64,
    pub total_earned_cents: i64,
    pub average_accuracy: Option<f64>,
    pub is_me: bool,
}

/// Leaderboard response
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub period: LeaderboardPeriod,
    pub entries: Vec<LeaderboardEntry>,
}

/// Own profile
pub async fn get_profile(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Updates own profile; omitted fields stay unchanged
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    let user = User::update_profile(
        &state.db,
        auth.user_id,
        UpdateProfile {
            first_name: req.first_name,
            last_name: req.last_name,
            phone_number: req.phone_number,
            preferred_language: req.preferred_language,
            skill_categories: req.skill_categories,
            company_name: req.company_name,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::debug!(user_id = %user.id, "Profile updated");

    Ok(Json(user))
}

/// Own performance statistics
pub async fn user_stats(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<UserStatsResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let all_time = Submission::totals_for_user(&state.db, user.id, None).await?;
    let last_30_days =
        Submission::totals_for_user(&state.db, user.id, Some(Utc::now() - Duration::days(30)))
            .await?;
    let performance_trend = Submission::performance_trend(&state.db, user.id).await?;

    Ok(Json(UserStatsResponse {
        accuracy_rating: user.accuracy_rating,
        tasks_completed: user.tasks_completed,
        member_since: user.created_at,
        all_time,
        last_30_days,
        performance_trend,
    }))
}

/// Top trainers by approved earnings in the period
pub async fn leaderboard(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let rows = User::leaderboard(&state.db, query.period, limit).await?;

    let entries = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| LeaderboardEntry {
            rank: i + 1,
            user_id: row.user_id,
            display_name: display_name(&row.first_name, &row.last_name),
            accuracy_rating: row.accuracy_rating,
            tasks_completed: row.tasks_completed,
            total_earned_cents: row.total_earned_cents,
            average_accuracy: row.average_accuracy,
            is_me: row.user_id == auth.user_id,
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        period: query.period,
        entries,
    }))
}
