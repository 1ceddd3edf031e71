/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use train_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = train_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::security_headers};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use train_shared::{auth::middleware::authenticate, monetization::reader::SettingsReader};

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Cached monetization settings
    pub settings: SettingsReader,
}

impl AppState {
    /// Creates new application state with a PostgreSQL-backed settings reader
    pub fn new(db: PgPool, config: Config) -> Self {
        let settings = SettingsReader::postgres(db.clone(), config.settings_cache_ttl());

        Self {
            db,
            config: Arc::new(config),
            settings,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                         # Health check (public)
/// └── /api/
///     ├── /auth/                      # register, login, refresh (public), me
///     ├── /tasks/                     # marketplace
///     ├── /submissions/               # trainer work
///     ├── /payments/                  # balance, history, withdrawals
///     ├── /users/                     # profile, stats, leaderboard
///     ├── /clients/                   # client dashboard and reviews
///     ├── /admin/                     # monetization, analytics, payouts
///     └── /subscriptions/             # plans (public), subscribe, cancel
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Compression (tower-http CompressionLayer)
/// 4. Logging (tower-http TraceLayer)
/// 5. JWT authentication (per route group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_layer = || middleware::from_fn_with_state(state.clone(), jwt_auth_layer);

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .layer(auth_layer())
        .merge(public_auth_routes);

    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_tasks).post(routes::tasks::create_task))
        .route("/stats/summary", get(routes::tasks::task_summary))
        .route("/:id", get(routes::tasks::get_task))
        .layer(auth_layer());

    let submission_routes = Router::new()
        .route(
            "/",
            get(routes::submissions::list_submissions).post(routes::submissions::create_submission),
        )
        .route("/stats/summary", get(routes::submissions::submission_summary))
        .route("/:id", get(routes::submissions::get_submission))
        .layer(auth_layer());

    let payment_routes = Router::new()
        .route("/balance", get(routes::payments::get_balance))
        .route("/history", get(routes::payments::payment_history))
        .route("/withdraw", post(routes::payments::withdraw))
        .route("/earnings-breakdown", get(routes::payments::earnings_breakdown))
        .layer(auth_layer());

    let user_routes = Router::new()
        .route(
            "/profile",
            get(routes::users::get_profile).put(routes::users::update_profile),
        )
        .route("/stats", get(routes::users::user_stats))
        .route("/leaderboard", get(routes::users::leaderboard))
        .layer(auth_layer());

    let client_routes = Router::new()
        .route("/dashboard", get(routes::clients::dashboard))
        .route("/tasks", get(routes::clients::list_tasks))
        .route("/tasks/:task_id/submissions", get(routes::clients::task_submissions))
        .route("/submissions/:id/review", put(routes::clients::review_submission))
        .layer(auth_layer());

    let admin_routes = Router::new()
        .route("/monetization", get(routes::admin::list_strategies))
        .route("/monetization/:key/toggle", patch(routes::admin::toggle_strategy))
        .route("/monetization/:key/config", patch(routes::admin::update_strategy_config))
        .route("/revenue", get(routes::admin::revenue))
        .route("/users", get(routes::admin::list_users))
        .route("/subscription-plans", get(routes::admin::list_plans))
        .route("/payments/:id/settle", post(routes::admin::settle_payment))
        .layer(auth_layer());

    let subscription_routes = Router::new()
        .route("/my-subscription", get(routes::subscriptions::my_subscription))
        .route("/subscribe", post(routes::subscriptions::subscribe))
        .route("/cancel", delete(routes::subscriptions::cancel))
        .layer(auth_layer())
        .route("/plans", get(routes::subscriptions::list_plans));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/submissions", submission_routes)
        .nest("/payments", payment_routes)
        .nest("/users", user_routes)
        .nest("/clients", client_routes)
        .nest("/admin", admin_routes)
        .nest("/subscriptions", subscription_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let hsts = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(middleware::from_fn(move |req, next| {
            security_headers(hsts, req, next)
        }))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Validates the Bearer access token and injects the `AuthContext` into
/// request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret())?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
