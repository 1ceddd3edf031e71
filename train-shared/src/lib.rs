//! # trAIn Shared Library
//!
//! Shared types, persistence and ledger logic used by the trAIn API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Authentication and capability-based authorization
//! - `db`: Connection pool and migrations
//! - `ledger`: Submission intake, review settlement and withdrawals
//! - `monetization`: Strategy settings, settings cache and commission math

pub mod auth;
pub mod db;
pub mod ledger;
pub mod models;
pub mod monetization;

/// Current version of the trAIn shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
