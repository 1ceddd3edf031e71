//! Integration tests for the trAIn API
//!
//! The first group runs against a pool that never connects and covers
//! everything answered before the first query. The rest needs
//! `DATABASE_URL` and returns early without it:
//! - Submission intake and review settlement
//! - Withdrawal requests and payout settlement
//! - Task capacity under concurrent submissions
//! - Monetization admin and subscriptions

mod common;

use axum::http::{Method, StatusCode};
use common::{offline_app, send, TestContext};
use serde_json::{json, Value};
use train_shared::auth::jwt::{create_token, Claims, TokenType};
use train_shared::models::user::UserRole;
use uuid::Uuid;

fn signed(role: UserRole, token_type: TokenType) -> String {
    let claims = Claims::new(
        Uuid::new_v4(),
        "someone@example.com".to_string(),
        role,
        token_type,
    );
    create_token(&claims, common::TEST_SECRET).unwrap()
}

#[tokio::test]
async fn test_missing_or_garbage_token_is_unauthorized() {
    let app = offline_app();

    let (status, body) = send(&app, Method::GET, "/api/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(&app, Method::GET, "/api/tasks", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = offline_app();
    let refresh = signed(UserRole::User, TokenType::Refresh);

    let (status, _) =
        send(&app, Method::GET, "/api/payments/balance", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_capabilities_are_enforced() {
    let app = offline_app();
    let trainer = signed(UserRole::User, TokenType::Access);
    let client = signed(UserRole::Client, TokenType::Access);

    let (status, _) =
        send(&app, Method::GET, "/api/admin/monetization", Some(&trainer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/api/clients/dashboard", Some(&trainer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/payments/withdraw",
        Some(&client),
        Some(json!({ "amount_cents": 2000 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_self_registration_is_forbidden() {
    let app = offline_app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "root@example.com",
            "password": "Sup3r$ecretPass",
            "first_name": "Root",
            "last_name": "Admin",
            "role": "admin"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let app = offline_app();

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
}

async fn submit(ctx: &TestContext, token: &str, task_id: Uuid) -> (StatusCode, Value) {
    ctx.request(
        Method::POST,
        "/api/submissions",
        Some(token),
        Some(json!({
            "task_id": task_id,
            "result_data": { "boxes": [[1, 2, 3, 4]] },
            "time_spent_seconds": 42
        })),
    )
    .await
}

async fn review(
    ctx: &TestContext,
    token: &str,
    submission_id: &Value,
    body: Value,
) -> (StatusCode, Value) {
    let uri = format!(
        "/api/clients/submissions/{}/review",
        submission_id.as_str().unwrap()
    );
    ctx.request(Method::PUT, &uri, Some(token), Some(body)).await
}

#[tokio::test]
async fn test_approval_moves_pending_into_total() {
    let Some(ctx) = TestContext::new().await else { return };
    let trainer = ctx.trainer().await;
    let client = ctx.client().await;
    let task = ctx.task(&client, 200, 5).await;

    let (status, submission) = submit(&ctx, &trainer.token, task.id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(submission["status"], "pending_review");
    assert_eq!(submission["payment_amount_cents"], 200);

    let pending = ctx.reload(trainer.user.id).await;
    assert_eq!(pending.pending_earnings_cents, 200);
    assert_eq!(pending.total_earnings_cents, 0);

    let (status, reviewed) = review(
        &ctx,
        &client.token,
        &submission["id"],
        json!({ "status": "approved", "accuracy_score": 90.0, "feedback": "Tight boxes" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "approved");

    let settled = ctx.reload(trainer.user.id).await;
    assert_eq!(settled.total_earnings_cents, 200);
    assert_eq!(settled.pending_earnings_cents, 0);
    assert_eq!(settled.tasks_completed, 1);
    assert_eq!(settled.accuracy_rating, 90.0);

    let (status, _) = review(
        &ctx,
        &client.token,
        &submission["id"],
        json!({ "status": "rejected" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_rejection_releases_pending() {
    let Some(ctx) = TestContext::new().await else { return };
    let trainer = ctx.trainer().await;
    let client = ctx.client().await;
    let task = ctx.task(&client, 350, 5).await;

    let (_, submission) = submit(&ctx, &trainer.token, task.id).await;

    let (status, reviewed) = review(
        &ctx,
        &client.token,
        &submission["id"],
        json!({ "status": "rejected", "feedback": "Wrong labels" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["payment_amount_cents"], 0);

    let user = ctx.reload(trainer.user.id).await;
    assert_eq!(user.pending_earnings_cents, 0);
    assert_eq!(user.total_earnings_cents, 0);
    assert_eq!(user.tasks_completed, 0);
}

#[tokio::test]
async fn test_review_input_and_ownership_errors() {
    let Some(ctx) = TestContext::new().await else { return };
    let trainer = ctx.trainer().await;
    let owner = ctx.client().await;
    let stranger = ctx.client().await;
    let task = ctx.task(&owner, 100, 5).await;

    let (_, submission) = submit(&ctx, &trainer.token, task.id).await;

    let (status, _) = review(
        &ctx,
        &stranger.token,
        &submission["id"],
        json!({ "status": "approved", "accuracy_score": 80.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = review(
        &ctx,
        &owner.token,
        &submission["id"],
        json!({ "status": "maybe" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = review(
        &ctx,
        &owner.token,
        &submission["id"],
        json!({ "status": "approved" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "accuracy_score");

    let (status, _) = review(
        &ctx,
        &owner.token,
        &submission["id"],
        json!({ "status": "approved", "accuracy_score": 101.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // None of the failed attempts touched the ledger
    let user = ctx.reload(trainer.user.id).await;
    assert_eq!(user.pending_earnings_cents, 100);
    assert_eq!(user.total_earnings_cents, 0);
}

#[tokio::test]
async fn test_duplicate_submission_is_rejected() {
    let Some(ctx) = TestContext::new().await else { return };
    let trainer = ctx.trainer().await;
    let client = ctx.client().await;
    let task = ctx.task(&client, 100, 5).await;

    let (status, _) = submit(&ctx, &trainer.token, task.id).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = submit(&ctx, &trainer.token, task.id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already"));

    let user = ctx.reload(trainer.user.id).await;
    assert_eq!(user.pending_earnings_cents, 100);
}

#[tokio::test]
async fn test_concurrent_submissions_respect_capacity() {
    let Some(ctx) = TestContext::new().await else { return };
    let client = ctx.client().await;
    let task = ctx.task(&client, 100, 1).await;

    let mut trainers = Vec::new();
    for _ in 0..5 {
        trainers.push(ctx.trainer().await);
    }

    let results = futures::future::join_all(
        trainers
            .iter()
            .map(|trainer| submit(&ctx, &trainer.token, task.id)),
    )
    .await;

    let created = results
        .iter()
        .filter(|(status, _)| *status == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1);
    assert!(results
        .iter()
        .all(|(status, _)| *status == StatusCode::CREATED || *status == StatusCode::BAD_REQUEST));

    let completed: i32 = sqlx::query_scalar("SELECT completed_tasks FROM tasks WHERE id = $1")
        .bind(task.id)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_eq!(completed, 1);

    let pending: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(pending_earnings_cents), 0)::BIGINT FROM users WHERE id = ANY($1)",
    )
    .bind(trainers.iter().map(|t| t.user.id).collect::<Vec<_>>())
    .fetch_one(&ctx.db)
    .await
    .unwrap();
    assert_eq!(pending, 100);
}

async fn fund(ctx: &TestContext, user_id: Uuid, cents: i64) {
    sqlx::query("UPDATE users SET total_earnings_cents = $2 WHERE id = $1")
        .bind(user_id)
        .bind(cents)
        .execute(&ctx.db)
        .await
        .unwrap();
}

async fn withdraw(ctx: &TestContext, token: &str, cents: i64) -> (StatusCode, Value) {
    ctx.request(
        Method::POST,
        "/api/payments/withdraw",
        Some(token),
        Some(json!({ "amount_cents": cents, "payment_method": "paypal" })),
    )
    .await
}

#[tokio::test]
async fn test_withdrawal_validation_leaves_balance_untouched() {
    let Some(ctx) = TestContext::new().await else { return };
    let trainer = ctx.trainer().await;
    fund(&ctx, trainer.user.id, 1500).await;

    let (status, body) = withdraw(&ctx, &trainer.token, 2000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Insufficient balance. Available: $15.00");

    let (status, body) = withdraw(&ctx, &trainer.token, 500).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Minimum withdrawal amount is $10.00");

    let (status, _) = withdraw(&ctx, &trainer.token, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let user = ctx.reload(trainer.user.id).await;
    assert_eq!(user.total_earnings_cents, 1500);
    assert_eq!(user.held_earnings_cents, 0);
}

#[tokio::test]
async fn test_completed_payout_debits_total() {
    let Some(ctx) = TestContext::new().await else { return };
    let trainer = ctx.trainer().await;
    let admin = ctx.admin().await;
    fund(&ctx, trainer.user.id, 1500).await;

    let (status, payment) = withdraw(&ctx, &trainer.token, 1200).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["status"], "pending");

    let (_, balance) = ctx
        .request(Method::GET, "/api/payments/balance", Some(&trainer.token), None)
        .await;
    assert_eq!(balance["held_earnings_cents"], 1200);
    assert_eq!(balance["available_balance_cents"], 300);

    // The held amount cannot be withdrawn twice
    let (status, _) = withdraw(&ctx, &trainer.token, 1200).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/admin/payments/{}/settle", payment["id"].as_str().unwrap());
    let (status, settled) = ctx
        .request(
            Method::POST,
            &uri,
            Some(&admin.token),
            Some(json!({ "outcome": "completed", "provider_reference": "PP-123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["status"], "completed");

    let user = ctx.reload(trainer.user.id).await;
    assert_eq!(user.total_earnings_cents, 300);
    assert_eq!(user.held_earnings_cents, 0);

    let (status, _) = ctx
        .request(
            Method::POST,
            &uri,
            Some(&admin.token),
            Some(json!({ "outcome": "failed" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_failed_payout_releases_hold() {
    let Some(ctx) = TestContext::new().await else { return };
    let trainer = ctx.trainer().await;
    let admin = ctx.admin().await;
    fund(&ctx, trainer.user.id, 1500).await;

    let (_, payment) = withdraw(&ctx, &trainer.token, 1500).await;
    let uri = format!("/api/admin/payments/{}/settle", payment["id"].as_str().unwrap());

    let (status, settled) = ctx
        .request(Method::POST, &uri, Some(&admin.token), Some(json!({ "outcome": "failed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["status"], "failed");

    let user = ctx.reload(trainer.user.id).await;
    assert_eq!(user.total_earnings_cents, 1500);
    assert_eq!(user.held_earnings_cents, 0);
}

#[tokio::test]
async fn test_strategy_config_is_validated() {
    let Some(ctx) = TestContext::new().await else { return };
    let admin = ctx.admin().await;

    let (status, strategies) = ctx
        .request(Method::GET, "/api/admin/monetization", Some(&admin.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(strategies.as_array().unwrap().len(), 6);

    let (status, body) = ctx
        .request(
            Method::PATCH,
            "/api/admin/monetization/platform_commission/config",
            Some(&admin.token),
            Some(json!({ "config": { "commission_rate": 1.5 } })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "config");

    let (status, _) = ctx
        .request(
            Method::PATCH,
            "/api/admin/monetization/lottery/toggle",
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscription_lifecycle() {
    let Some(ctx) = TestContext::new().await else { return };
    let trainer = ctx.trainer().await;
    let client = ctx.client().await;

    let (status, offered) = ctx
        .request(Method::GET, "/api/subscriptions/plans", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let plans = offered["plans"].as_array().unwrap();
    let free = plans
        .iter()
        .find(|p| p["name"] == "Free Trainer")
        .expect("free plan is always offered");

    let (status, _) = ctx
        .request(
            Method::POST,
            "/api/subscriptions/subscribe",
            Some(&client.token),
            Some(json!({ "plan_id": free["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, subscription) = ctx
        .request(
            Method::POST,
            "/api/subscriptions/subscribe",
            Some(&trainer.token),
            Some(json!({ "plan_id": free["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(subscription["plan_name"], "Free Trainer");
    assert_eq!(subscription["status"], "active");

    let (_, mine) = ctx
        .request(Method::GET, "/api/subscriptions/my-subscription", Some(&trainer.token), None)
        .await;
    assert_eq!(mine["subscription"]["plan_id"], free["id"]);

    let (status, _) = ctx
        .request(Method::DELETE, "/api/subscriptions/cancel", Some(&trainer.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .request(Method::DELETE, "/api/subscriptions/cancel", Some(&trainer.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, mine) = ctx
        .request(Method::GET, "/api/subscriptions/my-subscription", Some(&trainer.token), None)
        .await;
    assert!(mine["subscription"].is_null());
}
