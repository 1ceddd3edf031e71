/// Database models
///
/// Each model is a `sqlx::FromRow` struct with its queries as associated
/// functions. Reads take a `&PgPool`; writes that belong to a ledger flow take
/// a `&mut PgConnection` so they run inside the caller's transaction.
///
/// - [`user`]: accounts and earnings aggregates
/// - [`task`]: client-posted tasks
/// - [`submission`]: trainer work and review outcomes
/// - [`payment`]: payout ledger
/// - [`subscription`]: plans and user subscriptions
/// - [`monetization`]: strategy settings rows and commission revenue

pub mod monetization;
pub mod payment;
pub mod submission;
pub mod subscription;
pub mod task;
pub mod user;
